//! Lenient numeric deserializers for market-data payloads
//!
//! The remote API is inconsistent about numeric leaves: the same field may
//! arrive as a JSON number, a numeric string, `null`, or be missing. Numeric
//! leaves are read through these helpers so that odd encodings collapse to
//! `0` instead of failing the whole record. Structural mismatches (a missing
//! `id`, an object where an array is expected) still fail decoding.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Read any JSON value as an `f64`, falling back to `0.0`.
pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0.0, number_from_value))
}

/// Read any JSON value as a `u64`, falling back to `0`.
///
/// Fractional and negative inputs are clamped rather than rejected.
pub fn u64_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, |v| match v {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| clamp_to_u64(n.as_f64().unwrap_or(0.0))),
        _ => clamp_to_u64(number_from_value(v)),
    }))
}

/// Read an optional numeric field; `null` and unparseable values become `None`.
pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

/// Read an optional count; `null`, negative and unparseable values become `None`.
///
/// Fractional counts are truncated.
pub fn opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let n = match value {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(u) => return Ok(Some(u)),
            None => n.as_f64(),
        },
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|n| n.is_finite() && *n >= 0.0).map(clamp_to_u64))
}

/// Read a string field that may be `null`.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// Interpret a loose JSON leaf as a finite number.
pub(crate) fn number_from_value(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => 0.0,
    };
    finite_or_zero(n)
}

/// Replace NaN and infinities with `0.0`.
#[must_use]
pub fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() { n } else { 0.0 }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_to_u64(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        n.min(u64::MAX as f64) as u64
    } else {
        0
    }
}
