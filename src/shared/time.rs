use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::engine::types::FieldValue;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Utility for parsing and normalizing time inputs to epoch milliseconds (i64, UTC).
pub struct TimeParser;

impl TimeParser {
    /// Normalize a record field to epoch milliseconds.
    /// Returns Err with a human-readable reason if the value cannot be parsed.
    pub fn field_to_epoch_millis(value: &FieldValue) -> Result<i64, String> {
        let millis = match value {
            FieldValue::Int(i) => Self::normalize_integer_epoch(*i as i128)
                .ok_or_else(|| format!("Unrecognized integer time magnitude: {i}")),
            FieldValue::Float(f) => Self::float_seconds_to_millis(*f)
                .ok_or_else(|| format!("Unsupported numeric time value: {f}")),
            FieldValue::Str(s) => Self::parse_str_to_epoch_millis(s)
                .ok_or_else(|| format!("Invalid time string: '{s}'")),
            other => Err(format!(
                "Time field must be a number or string, found {}",
                other.kind()
            )),
        }?;
        Self::representable(millis)
            .ok_or_else(|| format!("Time value {millis} ms is outside the supported date range"))
    }

    /// Parse a string representing a time instant into epoch milliseconds (UTC).
    /// Supports RFC3339/ISO-8601, naive `YYYY-MM-DD HH:MM:SS[.fff]` (read as UTC),
    /// date-only (YYYY-MM-DD) and numeric epochs.
    pub fn parse_str_to_epoch_millis(input: &str) -> Option<i64> {
        Self::parse_str_unchecked(input).and_then(Self::representable)
    }

    /// Epoch milliseconds that map to a calendar date; everything else is rejected.
    pub fn representable(millis: i64) -> Option<i64> {
        DateTime::from_timestamp_millis(millis).map(|_| millis)
    }

    fn parse_str_unchecked(input: &str) -> Option<i64> {
        let s = input.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc).timestamp_millis());
        }
        for fmt in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive.and_utc().timestamp_millis());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
        }
        if let Ok(num) = s.parse::<i128>() {
            return Self::normalize_integer_epoch(num);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Self::float_seconds_to_millis(f);
        }
        None
    }

    /// Fractional seconds since the epoch.
    fn float_seconds_to_millis(f: f64) -> Option<i64> {
        if !f.is_finite() {
            return None;
        }
        let millis = (f * 1_000.0).floor();
        if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
            return None;
        }
        Some(millis as i64)
    }

    /// Heuristic normalization of integer magnitudes to milliseconds.
    /// - up to 11 digits: seconds
    /// - 12..=14: milliseconds
    /// - 15..=16: microseconds
    /// - 17..=19: nanoseconds
    fn normalize_integer_epoch(n: i128) -> Option<i64> {
        let abs = n.unsigned_abs();
        let digits = num_digits_u128(abs);
        let millis = match digits {
            0..=11 => n * 1_000,
            12..=14 => n,
            15..=16 => n.div_euclid(1_000),
            17..=19 => n.div_euclid(1_000_000),
            _ => return None,
        };
        i64::try_from(millis).ok()
    }
}

fn num_digits_u128(mut x: u128) -> u32 {
    if x == 0 {
        return 1;
    }
    let mut c = 0;
    while x > 0 {
        x /= 10;
        c += 1;
    }
    c
}
