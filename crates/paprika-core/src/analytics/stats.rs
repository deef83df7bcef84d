//! Statistical primitives: z-score anomalies, correlation, inequality, volatility

use serde::Serialize;

use super::{PoolField, mean, population_std_dev};
use crate::de::finite_or_zero;
use crate::model::{OhlcvBar, Pool};

/// Minimum sample size for anomaly detection
const MIN_ANOMALY_SAMPLES: usize = 3;

/// A value flagged as a statistical outlier
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyResult<'a, T> {
    /// Position in the source collection
    pub index: usize,
    /// Extracted value
    pub value: f64,
    /// Absolute z-score
    pub z_score: f64,
    /// The record the value came from
    pub item: &'a T,
}

/// Flag items whose extracted value lies at least `threshold` population
/// standard deviations from the mean
///
/// Needs at least three items. A constant series (σ = 0) has no anomalies.
#[must_use]
pub fn detect_anomalies<'a, T>(
    items: &'a [T],
    extract: impl Fn(&T) -> f64,
    threshold: f64,
) -> Vec<AnomalyResult<'a, T>> {
    if items.len() < MIN_ANOMALY_SAMPLES {
        return Vec::new();
    }

    let values: Vec<f64> = items.iter().map(|item| finite_or_zero(extract(item))).collect();
    let mu = mean(&values);
    let sigma = population_std_dev(&values);
    if sigma <= 0.0 || !sigma.is_finite() {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z_score = (value - mu).abs() / sigma;
            (z_score >= threshold).then(|| AnomalyResult {
                index,
                value,
                z_score,
                item: &items[index],
            })
        })
        .collect()
}

/// [`detect_anomalies`] keyed on a pool field
#[must_use]
pub fn detect_pool_anomalies(
    pools: &[Pool],
    field: PoolField,
    threshold: f64,
) -> Vec<AnomalyResult<'_, Pool>> {
    detect_anomalies(pools, |p| field.value(p), threshold)
}

/// Pearson correlation of two equal-length series
///
/// Returns `0.0` for mismatched lengths, fewer than two points, or when
/// either series has zero variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return 0.0;
    }

    let xs: Vec<f64> = xs.iter().copied().map(finite_or_zero).collect();
    let ys: Vec<f64> = ys.iter().copied().map(finite_or_zero).collect();
    let (mx, my) = (mean(&xs), mean(&ys));

    let covariance: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let var_x: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let var_y: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        covariance / denominator
    }
}

/// Gini coefficient of a distribution
///
/// `G = Σ s[i]·(2i+1−n) / (n²·mean)` over the ascending sort `s`.
/// Returns `0.0` for fewer than two values or a zero mean.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gini(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mut sorted: Vec<f64> = values.iter().copied().map(finite_or_zero).collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mu = mean(&sorted);
    if mu == 0.0 {
        return 0.0;
    }

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| v * (2.0 * i as f64 + 1.0 - n))
        .sum();
    weighted / (n * n * mu)
}

/// Population standard deviation of simple close-to-close returns
///
/// Pairs whose earlier close is zero are skipped. Fewer than two usable
/// returns yields `0.0`.
#[must_use]
pub fn volatility(bars: &[OhlcvBar]) -> f64 {
    let returns: Vec<f64> = bars
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (finite_or_zero(pair[0].close), finite_or_zero(pair[1].close));
            (prev != 0.0).then(|| (next - prev) / prev)
        })
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }
    population_std_dev(&returns)
}

/// Percentage change from `previous` to `current`; `0.0` when `previous` is zero
#[must_use]
pub fn price_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    finite_or_zero((current - previous) / previous * 100.0)
}

/// Volume-weighted average of the typical price `(high + low + close) / 3`
#[must_use]
pub fn volume_weighted_price(bars: &[OhlcvBar]) -> f64 {
    let (value, volume) = bars.iter().fold((0.0, 0.0), |(value, volume), bar| {
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        let v = finite_or_zero(bar.volume);
        (value + finite_or_zero(typical) * v, volume + v)
    });
    if volume == 0.0 { 0.0 } else { value / volume }
}

/// Headline numbers for an OHLCV slice
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OhlcvSummary {
    /// Number of bars
    pub bars: usize,
    /// Open of the first bar
    pub open: f64,
    /// Close of the last bar
    pub close: f64,
    /// Highest high
    pub high: f64,
    /// Lowest low
    pub low: f64,
    /// Sum of volumes
    pub total_volume: f64,
    /// Percentage change from first open to last close
    pub change_pct: f64,
    /// Close-to-close volatility
    pub volatility: f64,
}

/// Summarise a bar series; all zeros for an empty one
#[must_use]
pub fn ohlcv_summary(bars: &[OhlcvBar]) -> OhlcvSummary {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return OhlcvSummary::default();
    };

    let high = bars.iter().map(|b| finite_or_zero(b.high)).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| finite_or_zero(b.low)).fold(f64::MAX, f64::min);
    let open = finite_or_zero(first.open);
    let close = finite_or_zero(last.close);

    OhlcvSummary {
        bars: bars.len(),
        open,
        close,
        high,
        low,
        total_volume: bars.iter().map(|b| finite_or_zero(b.volume)).sum(),
        change_pct: price_change(close, open),
        volatility: volatility(bars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bar, pool};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn anomaly_flags_single_outlier() {
        let values = [1.0, 1.0, 1.0, 1.0, 100.0];
        let found = detect_anomalies(&values, |v| *v, 2.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 4);
        assert!(close(found[0].value, 100.0));
        assert!(std::ptr::eq(found[0].item, &values[4]));
    }

    #[test]
    fn anomaly_constant_series_is_empty() {
        let values = [5.0, 5.0, 5.0];
        assert!(detect_anomalies(&values, |v| *v, 1.0).is_empty());
    }

    #[test]
    fn anomaly_needs_three_values() {
        let values = [1.0, 1000.0];
        assert!(detect_anomalies(&values, |v| *v, 0.1).is_empty());
    }

    #[test]
    fn pool_anomalies_by_field() {
        let pools = vec![
            pool("a", "x", 10.0),
            pool("b", "x", 11.0),
            pool("c", "x", 9.0),
            pool("d", "x", 10.0),
            pool("whale", "x", 10_000.0),
        ];
        let found = detect_pool_anomalies(&pools, PoolField::VolumeUsd, 1.5);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item.id, "whale");
    }

    #[test]
    fn correlation_perfect_and_inverse() {
        assert!(close(correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0));
        assert!(close(correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0));
    }

    #[test]
    fn correlation_degenerate_cases() {
        assert!(close(correlation(&[1.0, 2.0], &[1.0]), 0.0));
        assert!(close(correlation(&[1.0], &[1.0]), 0.0));
        assert!(close(correlation(&[4.0, 4.0, 4.0], &[1.0, 2.0, 3.0]), 0.0));
    }

    #[test]
    fn gini_equal_and_concentrated() {
        assert!(close(gini(&[10.0, 10.0, 10.0, 10.0]), 0.0));
        assert!(close(gini(&[0.0, 0.0, 0.0, 100.0]), 0.75));
        assert!(close(gini(&[100.0, 0.0, 0.0, 0.0]), 0.75));
    }

    #[test]
    fn gini_degenerate_cases() {
        assert!(close(gini(&[]), 0.0));
        assert!(close(gini(&[42.0]), 0.0));
        assert!(close(gini(&[0.0, 0.0]), 0.0));
    }

    #[test]
    fn volatility_flat_series_is_zero() {
        let bars = vec![
            bar("2025-01-01T00:00:00Z", 100.0),
            bar("2025-01-02T00:00:00Z", 100.0),
            bar("2025-01-03T00:00:00Z", 100.0),
        ];
        assert!(close(volatility(&bars), 0.0));
    }

    #[test]
    fn volatility_of_alternating_returns() {
        // returns: +10%, -10%  → mean 0, σ = 0.1
        let bars = vec![
            bar("2025-01-01T00:00:00Z", 100.0),
            bar("2025-01-02T00:00:00Z", 110.0),
            bar("2025-01-03T00:00:00Z", 99.0),
        ];
        assert!(close(volatility(&bars), 0.1));
    }

    #[test]
    fn volatility_skips_zero_prior_close() {
        let bars = vec![
            bar("2025-01-01T00:00:00Z", 0.0),
            bar("2025-01-02T00:00:00Z", 50.0),
            bar("2025-01-03T00:00:00Z", 55.0),
        ];
        // Only one usable return remains.
        assert!(close(volatility(&bars), 0.0));
    }

    #[test]
    fn price_change_guards_zero() {
        assert!(close(price_change(110.0, 100.0), 10.0));
        assert!(close(price_change(5.0, 0.0), 0.0));
    }

    #[test]
    fn vwap_uses_typical_price() {
        let mut a = bar("2025-01-01T00:00:00Z", 10.0);
        a.high = 10.0;
        a.low = 10.0;
        a.volume = 1.0;
        let mut b = bar("2025-01-02T00:00:00Z", 20.0);
        b.high = 20.0;
        b.low = 20.0;
        b.volume = 3.0;
        assert!(close(volume_weighted_price(&[a, b]), 17.5));
        assert!(close(volume_weighted_price(&[]), 0.0));
    }

    #[test]
    fn summary_of_series() {
        let mut a = bar("2025-01-01T00:00:00Z", 110.0);
        a.open = 100.0;
        a.high = 120.0;
        a.low = 95.0;
        a.volume = 5.0;
        let mut b = bar("2025-01-02T00:00:00Z", 121.0);
        b.high = 125.0;
        b.low = 105.0;
        b.volume = 7.0;

        let summary = ohlcv_summary(&[a, b]);
        assert_eq!(summary.bars, 2);
        assert!(close(summary.high, 125.0));
        assert!(close(summary.low, 95.0));
        assert!(close(summary.total_volume, 12.0));
        assert!(close(summary.change_pct, 21.0));
        assert_eq!(ohlcv_summary(&[]), OhlcvSummary::default());
    }

    #[test]
    fn summary_serializes_each_figure_once() {
        let value = serde_json::to_value(ohlcv_summary(&[bar("2025-01-01T00:00:00Z", 1.0)])).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["bars", "change_pct", "close", "high", "low", "open", "total_volume", "volatility"]
        );
    }
}
