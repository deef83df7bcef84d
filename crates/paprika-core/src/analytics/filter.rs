//! Filtering and ordering of fetched records
//!
//! Every function returns a new vector and preserves input order among
//! retained (or equal-keyed) elements.

use chrono::{DateTime, Duration, Utc};

use super::PoolField;
use crate::model::{OhlcvBar, Pool, Transaction};

/// Pools whose absolute 24h price change is at least `min_change`
#[must_use]
pub fn filter_by_price_change(pools: &[Pool], min_change: f64) -> Vec<Pool> {
    retain(pools, |p| {
        PoolField::PriceChange24h.value(p).abs() >= min_change
    })
}

/// Pools with aggregate USD volume of at least `min_volume`
#[must_use]
pub fn filter_by_volume(pools: &[Pool], min_volume: f64) -> Vec<Pool> {
    retain(pools, |p| PoolField::VolumeUsd.value(p) >= min_volume)
}

/// Pools on `network` (case-insensitive)
#[must_use]
pub fn filter_by_network(pools: &[Pool], network: &str) -> Vec<Pool> {
    retain(pools, |p| p.chain.eq_ignore_ascii_case(network))
}

/// Pools whose DEX name contains `dex_name` (case-insensitive)
#[must_use]
pub fn filter_by_dex(pools: &[Pool], dex_name: &str) -> Vec<Pool> {
    let needle = dex_name.to_lowercase();
    retain(pools, |p| p.dex_name.to_lowercase().contains(&needle))
}

/// Pools holding a token with the given symbol (case-insensitive)
#[must_use]
pub fn filter_by_token_symbol(pools: &[Pool], symbol: &str) -> Vec<Pool> {
    retain(pools, |p| {
        p.tokens.iter().any(|t| t.symbol.eq_ignore_ascii_case(symbol))
    })
}

/// Pools holding a token with the given address (case-insensitive)
#[must_use]
pub fn filter_by_token_address(pools: &[Pool], address: &str) -> Vec<Pool> {
    retain(pools, |p| p.tokens.iter().any(|t| t.id.eq_ignore_ascii_case(address)))
}

/// Stable sort on a numeric field
#[must_use]
pub fn sort_by_field(pools: &[Pool], field: PoolField, descending: bool) -> Vec<Pool> {
    let mut sorted = pools.to_vec();
    sorted.sort_by(|a, b| {
        let (a, b) = (field.value(a), field.value(b));
        if descending { b.total_cmp(&a) } else { a.total_cmp(&b) }
    });
    sorted
}

/// The `n` largest pools by `field`; all of them if fewer than `n`
#[must_use]
pub fn top_n(pools: &[Pool], field: PoolField, n: usize) -> Vec<Pool> {
    let mut sorted = sort_by_field(pools, field, true);
    sorted.truncate(n);
    sorted
}

/// The `n` smallest pools by `field`; all of them if fewer than `n`
#[must_use]
pub fn bottom_n(pools: &[Pool], field: PoolField, n: usize) -> Vec<Pool> {
    let mut sorted = sort_by_field(pools, field, false);
    sorted.truncate(n);
    sorted
}

/// Transactions created strictly after `now - hours`
///
/// Transactions with unparseable timestamps are dropped.
#[must_use]
pub fn filter_recent_transactions(
    transactions: &[Transaction],
    hours: u32,
    now: DateTime<Utc>,
) -> Vec<Transaction> {
    let cutoff = now - Duration::hours(i64::from(hours));
    transactions
        .iter()
        .filter(|tx| tx.created().is_some_and(|t| t > cutoff))
        .cloned()
        .collect()
}

/// Transactions whose combined USD leg price is at least `min_usd`
#[must_use]
pub fn filter_large_transactions(transactions: &[Transaction], min_usd: f64) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.value_usd() >= min_usd)
        .cloned()
        .collect()
}

/// Bars opening strictly inside `(start, end)`
///
/// Bars with unparseable timestamps are dropped.
#[must_use]
pub fn filter_by_timeframe(
    bars: &[OhlcvBar],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<OhlcvBar> {
    bars.iter()
        .filter(|bar| bar.opened_at().is_some_and(|t| t > start && t < end))
        .cloned()
        .collect()
}

fn retain(pools: &[Pool], keep: impl Fn(&Pool) -> bool) -> Vec<Pool> {
    pools.iter().filter(|p| keep(p)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pool, token};
    use pretty_assertions::assert_eq;

    fn ids(pools: &[Pool]) -> Vec<&str> {
        pools.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn volume_and_price_change_filters() {
        let mut a = pool("a", "Uniswap", 5_000_000.0);
        a.last_price_change_usd_24h = -12.0;
        let mut b = pool("b", "Raydium", 100.0);
        b.last_price_change_usd_24h = 3.0;

        assert_eq!(ids(&filter_by_volume(&[a.clone(), b.clone()], 1_000.0)), vec!["a"]);
        assert_eq!(ids(&filter_by_price_change(&[a, b], 10.0)), vec!["a"]);
    }

    #[test]
    fn network_and_dex_filters_ignore_case() {
        let mut a = pool("a", "Uniswap V3", 1.0);
        a.chain = "Ethereum".into();
        let b = pool("b", "Orca", 1.0);

        assert_eq!(ids(&filter_by_network(&[a.clone(), b.clone()], "ethereum")), vec!["a"]);
        assert_eq!(ids(&filter_by_dex(&[a, b], "uniswap")), vec!["a"]);
    }

    #[test]
    fn token_filters() {
        let mut a = pool("a", "Uniswap", 1.0);
        a.tokens = vec![token("0xAbC", "WETH"), token("0xdef", "USDC")];
        let b = pool("b", "Uniswap", 1.0);

        assert_eq!(ids(&filter_by_token_symbol(&[a.clone(), b.clone()], "weth")), vec!["a"]);
        assert_eq!(ids(&filter_by_token_address(&[a, b], "0xabc")), vec!["a"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let pools = vec![
            pool("first", "x", 10.0),
            pool("big", "x", 99.0),
            pool("second", "x", 10.0),
        ];
        assert_eq!(
            ids(&sort_by_field(&pools, PoolField::VolumeUsd, true)),
            vec!["big", "first", "second"]
        );
        assert_eq!(
            ids(&sort_by_field(&pools, PoolField::VolumeUsd, false)),
            vec!["first", "second", "big"]
        );
    }

    #[test]
    fn top_and_bottom_n() {
        let pools = vec![pool("a", "x", 1.0), pool("b", "x", 3.0), pool("c", "x", 2.0)];
        assert_eq!(ids(&top_n(&pools, PoolField::VolumeUsd, 2)), vec!["b", "c"]);
        assert_eq!(ids(&bottom_n(&pools, PoolField::VolumeUsd, 1)), vec!["a"]);
        assert_eq!(top_n(&pools, PoolField::VolumeUsd, 10).len(), 3);
    }

    #[test]
    fn absent_interval_field_sorts_as_zero() {
        let mut a = pool("a", "x", 0.0);
        a.h24 = Some(crate::model::IntervalMetrics {
            volume_usd: 5.0,
            ..Default::default()
        });
        let b = pool("b", "x", 0.0);
        assert_eq!(ids(&top_n(&[b, a], PoolField::Volume24h, 2)), vec!["a", "b"]);
    }

    #[test]
    fn recent_transactions_window() {
        let now = "2025-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let mk = |id: &str, at: &str| Transaction {
            created_at: at.to_string(),
            ..crate::testing::transaction(id)
        };
        let txs = vec![
            mk("fresh", "2025-03-01T11:00:00Z"),
            mk("old", "2025-02-27T11:00:00Z"),
            mk("broken", "yesterday"),
        ];
        let recent = filter_recent_transactions(&txs, 24, now);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "fresh");
    }

    #[test]
    fn large_transactions() {
        let mut big = crate::testing::transaction("big");
        big.price_0_usd = 900.0;
        big.price_1_usd = 200.0;
        let small = crate::testing::transaction("small");
        let out = filter_large_transactions(&[big, small], 1_000.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "big");
    }

    #[test]
    fn timeframe_is_exclusive() {
        let bars = vec![
            crate::testing::bar("2025-01-01T00:00:00Z", 1.0),
            crate::testing::bar("2025-01-02T00:00:00Z", 1.0),
            crate::testing::bar("2025-01-03T00:00:00Z", 1.0),
        ];
        let start = "2025-01-01T00:00:00Z".parse().unwrap();
        let end = "2025-01-03T00:00:00Z".parse().unwrap();
        let out = filter_by_timeframe(&bars, start, end);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].time_open, "2025-01-02T00:00:00Z");
    }
}
