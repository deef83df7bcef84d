//! Volume distribution across pools and DEXes

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{PoolField, gini};
use crate::model::Pool;

/// Fixed USD volume bands used for the pool histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VolumeBucket {
    /// Below $1M
    #[serde(rename = "< 1M")]
    UnderOneMillion,
    /// $1M up to $10M
    #[serde(rename = "1M-10M")]
    OneToTenMillion,
    /// $10M up to $100M
    #[serde(rename = "10M-100M")]
    TenToHundredMillion,
    /// $100M and above
    #[serde(rename = "> 100M")]
    OverHundredMillion,
}

impl VolumeBucket {
    /// All buckets, smallest first
    pub const ALL: [Self; 4] = [
        Self::UnderOneMillion,
        Self::OneToTenMillion,
        Self::TenToHundredMillion,
        Self::OverHundredMillion,
    ];

    /// Bucket a USD volume falls into
    #[must_use]
    pub fn for_volume(volume: f64) -> Self {
        if volume < 1_000_000.0 {
            Self::UnderOneMillion
        } else if volume < 10_000_000.0 {
            Self::OneToTenMillion
        } else if volume < 100_000_000.0 {
            Self::TenToHundredMillion
        } else {
            Self::OverHundredMillion
        }
    }
}

/// Snapshot of how volume spreads across a pool collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityAnalysis {
    pub total_liquidity: f64,
    pub pool_count: usize,
    pub average_liquidity: f64,
    pub median_liquidity: f64,
    pub gini_coefficient: f64,
    /// Share of total volume held by the top decile (at least one pool)
    pub top_pools_share: f64,
    /// Fraction of pools per volume band; sums to 1 for a non-empty input
    pub distribution: BTreeMap<VolumeBucket, f64>,
}

impl LiquidityAnalysis {
    fn empty() -> Self {
        Self {
            total_liquidity: 0.0,
            pool_count: 0,
            average_liquidity: 0.0,
            median_liquidity: 0.0,
            gini_coefficient: 0.0,
            top_pools_share: 0.0,
            distribution: VolumeBucket::ALL.into_iter().map(|b| (b, 0.0)).collect(),
        }
    }
}

/// Analyse the USD volume distribution of `pools`
///
/// Volume stands in for liquidity, which the pool listings do not carry.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn liquidity_distribution(pools: &[Pool]) -> LiquidityAnalysis {
    if pools.is_empty() {
        return LiquidityAnalysis::empty();
    }

    let mut volumes: Vec<f64> = pools.iter().map(|p| PoolField::VolumeUsd.value(p)).collect();
    volumes.sort_by(f64::total_cmp);

    let n = volumes.len();
    let total: f64 = volumes.iter().sum();

    let median = if n % 2 == 0 {
        (volumes[n / 2 - 1] + volumes[n / 2]) / 2.0
    } else {
        volumes[n / 2]
    };

    let top_count = n.div_ceil(10).max(1);
    let top_volume: f64 = volumes.iter().rev().take(top_count).sum();
    let top_pools_share = if total > 0.0 { top_volume / total } else { 0.0 };

    let mut distribution: BTreeMap<VolumeBucket, f64> =
        VolumeBucket::ALL.into_iter().map(|b| (b, 0.0)).collect();
    for &volume in &volumes {
        *distribution.entry(VolumeBucket::for_volume(volume)).or_default() += 1.0;
    }
    for fraction in distribution.values_mut() {
        *fraction /= n as f64;
    }

    LiquidityAnalysis {
        total_liquidity: total,
        pool_count: n,
        average_liquidity: total / n as f64,
        median_liquidity: median,
        gini_coefficient: gini(&volumes),
        top_pools_share,
        distribution,
    }
}

/// How volume concentrates across DEXes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexDistribution {
    pub total_volume: f64,
    pub dex_count: usize,
    /// Volume share per DEX name
    pub distribution: BTreeMap<String, f64>,
    /// DEX names ordered by volume, largest first
    pub top_dexes: Vec<String>,
    /// Herfindahl–Hirschman index: Σ share²
    pub concentration: f64,
}

/// Group pools by DEX name and measure volume concentration
#[must_use]
pub fn dex_distribution(pools: &[Pool]) -> DexDistribution {
    let mut volumes: HashMap<&str, f64> = HashMap::new();
    for pool in pools {
        *volumes.entry(pool.dex_name.as_str()).or_default() += PoolField::VolumeUsd.value(pool);
    }
    let total: f64 = volumes.values().sum();

    let distribution: BTreeMap<String, f64> = if total > 0.0 {
        volumes
            .iter()
            .map(|(dex, v)| ((*dex).to_string(), v / total))
            .collect()
    } else {
        BTreeMap::new()
    };

    let mut ranked: Vec<(&str, f64)> = volumes.iter().map(|(d, v)| (*d, *v)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    DexDistribution {
        total_volume: total,
        dex_count: volumes.len(),
        concentration: distribution.values().map(|s| s * s).sum(),
        distribution,
        top_dexes: ranked.into_iter().map(|(d, _)| d.to_string()).collect(),
    }
}
