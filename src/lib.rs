//! Paprika Gateway Library
//!
//! Client-side data acquisition for the DexPaprika market-data API.
//!
//! # Features
//!
//! - **Response Cache**: fingerprinted, TTL-bounded, optionally mirrored to disk
//! - **Request Gateway**: cache lookup, transport call, typed decode, cache fill
//! - **Batch Dispatcher**: one task per target with per-target failure isolation
//!   and a shared cancellation token
//! - **Typed Client**: every endpoint decodes into an explicit schema
//! - **Analytics**: pure statistics over fetched data (re-exported from
//!   `paprika-core`)

#![forbid(unsafe_code)]

pub mod batch;
pub mod cache;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod params;
pub mod retry;
pub mod transport;

pub use batch::{BatchDispatcher, BatchEntry, BatchResults, Deadline, deadline, deadline_within};
pub use cache::{CacheStatsSnapshot, Fingerprint, ResponseCache};
pub use client::{MarketOverview, NetworkOverview, PaprikaClient, PriceUpdate, TokenLiquidityReport};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::RequestGateway;
pub use paprika_core::{analytics, model};
pub use params::ApiParams;
pub use tokio_util::sync::CancellationToken;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level`. Logs go to stderr so command
/// output on stdout stays machine readable.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
