//! Paprika core library
//!
//! Domain model and pure analytics for DexPaprika market data. This crate
//! performs no I/O; fetching, caching and fan-out live in `paprika-gateway`.

#![forbid(unsafe_code)]

pub mod analytics;
pub mod de;
pub mod model;

pub use analytics::PoolField;
pub use model::{
    ApiErrorBody, Dex, DexesPage, Interval, IntervalMetrics, Network, OhlcvBar, PageInfo, Pool,
    PoolsPage, SearchResults, SystemStats, Token, TokenSummary, Transaction, TransactionPageInfo,
    TransactionsPage,
};
