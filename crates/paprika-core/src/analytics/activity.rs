//! Per-record activity reports

use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::de::finite_or_zero;
use crate::model::{Interval, Pool, Token, Transaction};

/// Trading activity of a single pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolActivity {
    pub pool_id: String,
    pub dex_name: String,
    pub chain: String,
    pub volume_usd: f64,
    pub transactions: u64,
    pub price_usd: f64,
    /// `None` when the pool has no trades
    pub volume_per_transaction: Option<f64>,
    pub price_change_24h: f64,
    pub price_change_1h: f64,
    pub price_change_5m: f64,
    /// `log10(volume + 1) · log10(trades + 1)`
    pub activity_score: f64,
    pub token_pair: Option<String>,
}

/// Summarise one pool's trading activity
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pool_activity(pool: &Pool) -> PoolActivity {
    let volume = finite_or_zero(pool.volume_usd).max(0.0);
    let trades = pool.transactions as f64;

    PoolActivity {
        pool_id: pool.id.clone(),
        dex_name: pool.dex_name.clone(),
        chain: pool.chain.clone(),
        volume_usd: volume,
        transactions: pool.transactions,
        price_usd: finite_or_zero(pool.price_usd),
        volume_per_transaction: (pool.transactions > 0).then(|| volume / trades),
        price_change_24h: finite_or_zero(pool.last_price_change_usd_24h),
        price_change_1h: finite_or_zero(pool.last_price_change_usd_1h),
        price_change_5m: finite_or_zero(pool.last_price_change_usd_5m),
        activity_score: (volume + 1.0).log10() * (trades + 1.0).log10(),
        token_pair: pool.pair_label(),
    }
}

/// Market performance of a single token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPerformance {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub chain: String,
    pub fdv: f64,
    pub price_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub pools_count: Option<u64>,
    pub avg_liquidity_per_pool: Option<f64>,
    pub fdv_to_liquidity_ratio: Option<f64>,
    pub volume_24h: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub transactions_24h: Option<u64>,
    pub volume_to_liquidity_ratio: Option<f64>,
}

/// Derive ratios from a token's summary block
///
/// Ratios with a zero denominator are left unset.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_performance(token: &Token) -> TokenPerformance {
    let mut report = TokenPerformance {
        token_id: token.id.clone(),
        name: token.name.clone(),
        symbol: token.symbol.clone(),
        chain: token.chain.clone(),
        fdv: finite_or_zero(token.fdv),
        price_usd: None,
        liquidity_usd: None,
        pools_count: None,
        avg_liquidity_per_pool: None,
        fdv_to_liquidity_ratio: None,
        volume_24h: None,
        price_change_24h: None,
        transactions_24h: None,
        volume_to_liquidity_ratio: None,
    };

    let Some(summary) = token.summary.as_ref() else {
        return report;
    };

    let liquidity = finite_or_zero(summary.liquidity_usd);
    report.price_usd = Some(finite_or_zero(summary.price_usd));
    report.liquidity_usd = Some(liquidity);
    report.pools_count = Some(summary.pools);
    report.avg_liquidity_per_pool = (summary.pools > 0).then(|| liquidity / summary.pools as f64);
    report.fdv_to_liquidity_ratio = (liquidity > 0.0).then(|| report.fdv / liquidity);

    if let Some(day) = summary.interval(Interval::H24) {
        let volume = finite_or_zero(day.volume_usd);
        report.volume_24h = Some(volume);
        report.price_change_24h = Some(finite_or_zero(day.last_price_usd_change));
        report.transactions_24h = Some(day.txns);
        report.volume_to_liquidity_ratio = (liquidity > 0.0).then(|| volume / liquidity);
    }

    report
}

/// Aggregate shape of a batch of transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatterns {
    pub total_transactions: usize,
    pub total_value_usd: f64,
    pub avg_value_per_tx: f64,
    /// UTC hour with the most transactions (earliest hour wins ties)
    pub peak_hour: Option<u32>,
    pub peak_hour_count: usize,
    /// Transactions per UTC hour; unparseable timestamps are not counted
    pub hourly_distribution: BTreeMap<u32, usize>,
    pub unique_pairs: usize,
    pub pair_distribution: BTreeMap<String, usize>,
}

/// Count transactions by hour and by token pair
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn transaction_patterns(transactions: &[Transaction]) -> TransactionPatterns {
    if transactions.is_empty() {
        return TransactionPatterns::default();
    }

    let mut hourly: BTreeMap<u32, usize> = BTreeMap::new();
    let mut pairs: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_value = 0.0;

    for tx in transactions {
        total_value += tx.value_usd();
        if let Some(at) = tx.created() {
            *hourly.entry(at.hour()).or_default() += 1;
        }
        *pairs.entry(tx.pair_label()).or_default() += 1;
    }

    let peak = hourly
        .iter()
        .fold(None, |best: Option<(u32, usize)>, (&hour, &count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((hour, count)),
        });

    TransactionPatterns {
        total_transactions: transactions.len(),
        total_value_usd: total_value,
        avg_value_per_tx: total_value / transactions.len() as f64,
        peak_hour: peak.map(|(h, _)| h),
        peak_hour_count: peak.map_or(0, |(_, c)| c),
        hourly_distribution: hourly,
        unique_pairs: pairs.len(),
        pair_distribution: pairs,
    }
}
