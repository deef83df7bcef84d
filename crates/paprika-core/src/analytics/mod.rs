//! Pure analytics over already-fetched market data
//!
//! Nothing in here performs I/O or fails. Missing or malformed numeric
//! inputs read as `0`, and degenerate statistical cases (fewer than two
//! observations, zero variance, zero mean) produce `0` or an empty result.

mod activity;
mod distribution;
mod filter;
mod stats;

pub use activity::{
    PoolActivity, TokenPerformance, TransactionPatterns, pool_activity, token_performance,
    transaction_patterns,
};
pub use distribution::{
    DexDistribution, LiquidityAnalysis, VolumeBucket, dex_distribution, liquidity_distribution,
};
pub use filter::{
    bottom_n, filter_by_dex, filter_by_network, filter_by_price_change, filter_by_timeframe,
    filter_by_token_address, filter_by_token_symbol, filter_by_volume, filter_large_transactions,
    filter_recent_transactions, sort_by_field, top_n,
};
pub use stats::{
    AnomalyResult, OhlcvSummary, correlation, detect_anomalies, detect_pool_anomalies, gini,
    ohlcv_summary, price_change, volatility, volume_weighted_price,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::de::finite_or_zero;
use crate::model::{Interval, Pool};

/// Numeric pool field that sorting and anomaly detection can key on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolField {
    /// Aggregate USD volume
    VolumeUsd,
    /// Current USD price
    PriceUsd,
    /// Trade count
    Transactions,
    /// 24h price change
    #[serde(rename = "last_price_change_usd_24h")]
    PriceChange24h,
    /// 1h price change
    #[serde(rename = "last_price_change_usd_1h")]
    PriceChange1h,
    /// 5m price change
    #[serde(rename = "last_price_change_usd_5m")]
    PriceChange5m,
    /// USD volume from the 24h interval block
    #[serde(rename = "volume_24h")]
    Volume24h,
    /// Trade count from the 24h interval block
    #[serde(rename = "txns_24h")]
    Txns24h,
    /// Pool fee
    Fee,
}

impl PoolField {
    /// All fields in declaration order
    pub const ALL: [Self; 9] = [
        Self::VolumeUsd,
        Self::PriceUsd,
        Self::Transactions,
        Self::PriceChange24h,
        Self::PriceChange1h,
        Self::PriceChange5m,
        Self::Volume24h,
        Self::Txns24h,
        Self::Fee,
    ];

    /// Wire name of the field
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VolumeUsd => "volume_usd",
            Self::PriceUsd => "price_usd",
            Self::Transactions => "transactions",
            Self::PriceChange24h => "last_price_change_usd_24h",
            Self::PriceChange1h => "last_price_change_usd_1h",
            Self::PriceChange5m => "last_price_change_usd_5m",
            Self::Volume24h => "volume_24h",
            Self::Txns24h => "txns_24h",
            Self::Fee => "fee",
        }
    }

    /// Read the field from a pool; absent values read as `0.0`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(self, pool: &Pool) -> f64 {
        let raw = match self {
            Self::VolumeUsd => pool.volume_usd,
            Self::PriceUsd => pool.price_usd,
            Self::Transactions => pool.transactions as f64,
            Self::PriceChange24h => pool.last_price_change_usd_24h,
            Self::PriceChange1h => pool.last_price_change_usd_1h,
            Self::PriceChange5m => pool.last_price_change_usd_5m,
            Self::Volume24h => pool.interval(Interval::H24).map_or(0.0, |m| m.volume_usd),
            Self::Txns24h => pool.interval(Interval::H24).map_or(0.0, |m| m.txns as f64),
            Self::Fee => pool.fee.unwrap_or(0.0),
        };
        finite_or_zero(raw)
    }
}

impl fmt::Display for PoolField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("unknown pool field: {s}"))
    }
}

/// Population mean; `0.0` for an empty slice
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; `0.0` for an empty slice
#[allow(clippy::cast_precision_loss)]
pub(crate) fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
