//! Serde helpers for the loosely-typed fields of both dbt Cloud APIs.
//!
//! Responsibilities:
//! - Accept either JSON numbers or strings for numeric fields.
//! - Treat `null` as the empty value for list and mapping fields.
//! - Parse the timestamp and duration formats the APIs emit.
//!
//! Explicitly does NOT handle:
//! - Validating higher-level semantics (see `models::factory`).
//!
//! Invariants / assumptions:
//! - Timestamps are accepted as RFC 3339 or as `YYYY-MM-DD HH:MM:SS[.f]+HH:MM`.
//! - These helpers must not log values; errors are generic parse errors.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
}

/// An integral float that fits in `i64`; `as` would saturate anything larger.
fn integral_f64(v: f64) -> Result<i64, String> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    const UPPER: f64 = i64::MAX as f64;
    const LOWER: f64 = i64::MIN as f64;
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(format!("expected integer, got {v}"));
    }
    if !(LOWER..UPPER).contains(&v) {
        return Err(format!("integer out of range: {v}"));
    }
    Ok(v as i64)
}

/// Deserialize `null` as `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn i64_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse::<i64>().map_err(D::Error::custom),
        StringOrNumber::I64(v) => Ok(v),
        StringOrNumber::U64(v) => i64::try_from(v).map_err(D::Error::custom),
        StringOrNumber::F64(v) => integral_f64(v).map_err(D::Error::custom),
    }
}

pub fn opt_i64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) => s.trim().parse::<i64>().map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::I64(v)) => Ok(Some(v)),
        Some(StringOrNumber::U64(v)) => i64::try_from(v).map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::F64(v)) => integral_f64(v).map(Some).map_err(D::Error::custom),
    }
}

pub fn opt_f64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) => s.trim().parse::<f64>().map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::I64(v)) => Ok(Some(v as f64)),
        Some(StringOrNumber::U64(v)) => Ok(Some(v as f64)),
        Some(StringOrNumber::F64(v)) => Ok(Some(v)),
    }
}

/// Parse a timestamp in any of the formats the dbt Cloud APIs emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive timestamps are UTC on both APIs.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}"))),
    }
}

pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {s}")))
}

/// Parse an `HH:MM:SS` duration into seconds.
pub fn parse_hms_duration(raw: &str) -> Option<f64> {
    let mut parts = raw.trim().split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Accept a run duration either as `HH:MM:SS` or as a number of seconds.
pub fn opt_duration_seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::String(s)) if s.contains(':') => parse_hms_duration(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid duration: {s}"))),
        Some(StringOrNumber::String(s)) => s.trim().parse::<f64>().map(Some).map_err(D::Error::custom),
        Some(StringOrNumber::I64(v)) => Ok(Some(v as f64)),
        Some(StringOrNumber::U64(v)) => Ok(Some(v as f64)),
        Some(StringOrNumber::F64(v)) => Ok(Some(v)),
    }
}
