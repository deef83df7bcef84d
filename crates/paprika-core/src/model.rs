//! Domain model for DexPaprika market data
//!
//! Each endpoint decodes into exactly one of these shapes. Records are plain
//! values: once decoded they are never mutated in place.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::{f64_or_zero, opt_f64, opt_u64, string_or_empty, u64_or_zero};

/// A blockchain network supported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Network identifier used in request paths (e.g. `ethereum`)
    pub id: String,
    /// Human readable name
    #[serde(default, deserialize_with = "string_or_empty")]
    pub display_name: String,
}

/// Rolling window a set of interval metrics covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interval {
    /// Last minute (token summaries only)
    #[serde(rename = "1m")]
    M1,
    /// Last 5 minutes
    #[serde(rename = "5m")]
    M5,
    /// Last 15 minutes
    #[serde(rename = "15m")]
    M15,
    /// Last 30 minutes
    #[serde(rename = "30m")]
    M30,
    /// Last hour
    #[serde(rename = "1h")]
    H1,
    /// Last 6 hours
    #[serde(rename = "6h")]
    H6,
    /// Last 24 hours
    #[serde(rename = "24h")]
    H24,
}

impl Interval {
    /// All intervals, shortest first
    pub const ALL: [Self; 7] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H6,
        Self::H24,
    ];

    /// Wire name of the interval
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H6 => "6h",
            Self::H24 => "24h",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| format!("unknown interval: {s}"))
    }
}

/// Trading activity over one interval
///
/// Present only when the API reported the interval; absent intervals are
/// `None` on the owning record, never zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalMetrics {
    /// Volume in token units
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub volume: f64,
    /// Volume in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub volume_usd: f64,
    /// Buy-side volume in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub buy_usd: f64,
    /// Sell-side volume in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub sell_usd: f64,
    /// Number of sells
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub sells: u64,
    /// Number of buys
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub buys: u64,
    /// Number of trades
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub txns: u64,
    /// Last price change in USD over the interval
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub last_price_usd_change: f64,
}

/// Aggregate market metrics attached to a token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSummary {
    /// Price in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_usd: f64,
    /// Fully diluted valuation
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub fdv: f64,
    /// Liquidity across all pools in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub liquidity_usd: f64,
    /// Number of pools the token trades in
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub pools: u64,
    #[serde(rename = "24h", default, skip_serializing_if = "Option::is_none")]
    pub h24: Option<IntervalMetrics>,
    #[serde(rename = "6h", default, skip_serializing_if = "Option::is_none")]
    pub h6: Option<IntervalMetrics>,
    #[serde(rename = "1h", default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<IntervalMetrics>,
    #[serde(rename = "30m", default, skip_serializing_if = "Option::is_none")]
    pub m30: Option<IntervalMetrics>,
    #[serde(rename = "15m", default, skip_serializing_if = "Option::is_none")]
    pub m15: Option<IntervalMetrics>,
    #[serde(rename = "5m", default, skip_serializing_if = "Option::is_none")]
    pub m5: Option<IntervalMetrics>,
    #[serde(rename = "1m", default, skip_serializing_if = "Option::is_none")]
    pub m1: Option<IntervalMetrics>,
}

impl TokenSummary {
    /// Metrics for one interval, if the API reported it
    #[must_use]
    pub fn interval(&self, interval: Interval) -> Option<&IntervalMetrics> {
        match interval {
            Interval::M1 => self.m1.as_ref(),
            Interval::M5 => self.m5.as_ref(),
            Interval::M15 => self.m15.as_ref(),
            Interval::M30 => self.m30.as_ref(),
            Interval::H1 => self.h1.as_ref(),
            Interval::H6 => self.h6.as_ref(),
            Interval::H24 => self.h24.as_ref(),
        }
    }
}

/// A token and its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token address / identifier
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub symbol: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub chain: String,
    #[serde(rename = "type", default, deserialize_with = "string_or_empty")]
    pub token_type: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub decimals: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub total_supply: f64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub website: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub explorer: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub added_at: String,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub fdv: f64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub last_updated: String,
    /// Market summary (only on the token-details endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TokenSummary>,
}

/// A liquidity pool on a DEX
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool address / identifier
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub dex_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub dex_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub chain: String,
    /// Aggregate volume in USD
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub volume_usd: f64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub created_at: String,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub created_at_block_number: u64,
    /// Trade count
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub transactions: u64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_usd: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub last_price_change_usd_5m: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub last_price_change_usd_1h: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub last_price_change_usd_24h: f64,
    #[serde(default, deserialize_with = "opt_f64", skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    /// Constituent tokens, in pool order
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default, deserialize_with = "opt_f64", skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    #[serde(default, deserialize_with = "opt_f64", skip_serializing_if = "Option::is_none")]
    pub last_price_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_time: Option<String>,
    #[serde(rename = "24h", default, skip_serializing_if = "Option::is_none")]
    pub h24: Option<IntervalMetrics>,
    #[serde(rename = "6h", default, skip_serializing_if = "Option::is_none")]
    pub h6: Option<IntervalMetrics>,
    #[serde(rename = "1h", default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<IntervalMetrics>,
    #[serde(rename = "30m", default, skip_serializing_if = "Option::is_none")]
    pub m30: Option<IntervalMetrics>,
    #[serde(rename = "15m", default, skip_serializing_if = "Option::is_none")]
    pub m15: Option<IntervalMetrics>,
    #[serde(rename = "5m", default, skip_serializing_if = "Option::is_none")]
    pub m5: Option<IntervalMetrics>,
}

impl Pool {
    /// Metrics for one interval, if the API reported it
    ///
    /// Pools carry no one-minute window, so [`Interval::M1`] is always `None`.
    #[must_use]
    pub fn interval(&self, interval: Interval) -> Option<&IntervalMetrics> {
        match interval {
            Interval::M1 => None,
            Interval::M5 => self.m5.as_ref(),
            Interval::M15 => self.m15.as_ref(),
            Interval::M30 => self.m30.as_ref(),
            Interval::H1 => self.h1.as_ref(),
            Interval::H6 => self.h6.as_ref(),
            Interval::H24 => self.h24.as_ref(),
        }
    }

    /// `BASE/QUOTE` label from the first two constituent tokens
    #[must_use]
    pub fn pair_label(&self) -> Option<String> {
        match self.tokens.as_slice() {
            [a, b, ..] => Some(format!("{}/{}", a.symbol, b.symbol)),
            _ => None,
        }
    }
}

/// Offset pagination block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub limit: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub page: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_items: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_pages: u64,
}

/// Page of pools (`/networks/{n}/pools`, dex pools, token pools)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolsPage {
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// A decentralized exchange deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dex {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub dex_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub dex_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub chain: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub protocol: String,
    #[serde(default, deserialize_with = "opt_f64", skip_serializing_if = "Option::is_none")]
    pub volume_usd_24h: Option<f64>,
    #[serde(default, deserialize_with = "opt_u64", skip_serializing_if = "Option::is_none")]
    pub txns_24h: Option<u64>,
    #[serde(default, deserialize_with = "opt_u64", skip_serializing_if = "Option::is_none")]
    pub pools_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Page of DEXes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexesPage {
    pub dexes: Vec<Dex>,
    #[serde(default)]
    pub page_info: PageInfo,
}

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// RFC 3339 open timestamp
    pub time_open: String,
    /// RFC 3339 close timestamp
    #[serde(default, deserialize_with = "string_or_empty")]
    pub time_close: String,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub open: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub high: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub low: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub close: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub volume: f64,
}

impl OhlcvBar {
    /// Parsed open time, if well formed
    #[must_use]
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.time_open)
    }
}

/// A swap recorded in a pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub log_index: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub transaction_index: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub pool_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub sender: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub recipient: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub token_0: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub token_0_symbol: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub token_1: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub token_1_symbol: String,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub amount_0: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub amount_1: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_0: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_1: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_0_usd: f64,
    #[serde(default, deserialize_with = "f64_or_zero")]
    pub price_1_usd: f64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub created_at_block_number: u64,
    /// RFC 3339 timestamp
    #[serde(default, deserialize_with = "string_or_empty")]
    pub created_at: String,
}

impl Transaction {
    /// Parsed creation time, if well formed
    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// Combined USD price of both legs
    #[must_use]
    pub fn value_usd(&self) -> f64 {
        crate::de::finite_or_zero(self.price_0_usd + self.price_1_usd)
    }

    /// `TOKEN0/TOKEN1` label
    #[must_use]
    pub fn pair_label(&self) -> String {
        format!("{}/{}", self.token_0_symbol, self.token_1_symbol)
    }
}

/// Pagination block for transactions (offset or cursor based)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPageInfo {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub limit: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub page: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_items: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub total_pages: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Page of pool transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsPage {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub page_info: TransactionPageInfo,
}

/// Result of `/search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub dexes: Vec<Dex>,
}

impl SearchResults {
    /// Total number of hits across all entity kinds
    #[must_use]
    pub fn total(&self) -> usize {
        self.tokens.len() + self.pools.len() + self.dexes.len()
    }
}

/// Result of `/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub chains: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub factories: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub pools: u64,
    #[serde(default, deserialize_with = "u64_or_zero")]
    pub tokens: u64,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Parse an RFC 3339 timestamp into UTC
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
