use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use super::frequency::Frequency;
use crate::engine::errors::ReduceError;
use crate::engine::types::FieldValue;
use crate::shared::time::TimeParser;

/// How bucket starts are rendered into result rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketLabel {
    /// `2024-01-15T14:30:00Z`
    #[default]
    Rfc3339,
    EpochMillis,
    EpochSeconds,
}

/// Start of a fixed-width time bucket, in epoch milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket(pub i64);

impl TimeBucket {
    pub fn start_millis(&self) -> i64 {
        self.0
    }
}

/// Floor `ts_millis` to a multiple of the frequency width counted from the Unix epoch.
pub fn bucket_of(ts_millis: i64, freq: &Frequency) -> TimeBucket {
    let width = freq.width_millis();
    TimeBucket(ts_millis.div_euclid(width).saturating_mul(width))
}

/// Epoch-aligned bucketing of record timestamps
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeBucketer {
    label: BucketLabel,
}

impl TimeBucketer {
    pub fn new(label: BucketLabel) -> Self {
        Self { label }
    }

    /// Read a timestamp field as epoch milliseconds.
    pub fn timestamp_of(field: &str, value: Option<&FieldValue>) -> Result<i64, ReduceError> {
        let value = value.ok_or_else(|| ReduceError::InvalidTimestamp {
            field: field.to_string(),
            reason: "field is missing".to_string(),
        })?;
        TimeParser::field_to_epoch_millis(value).map_err(|reason| ReduceError::InvalidTimestamp {
            field: field.to_string(),
            reason,
        })
    }

    /// Map a record's timestamp value to its bucket.
    pub fn bucket(
        &self,
        field: &str,
        value: Option<&FieldValue>,
        freq: &Frequency,
    ) -> Result<TimeBucket, ReduceError> {
        let ts = Self::timestamp_of(field, value)?;
        Ok(bucket_of(ts, freq))
    }

    pub fn label(&self, bucket: TimeBucket) -> FieldValue {
        match self.label {
            BucketLabel::Rfc3339 => match DateTime::from_timestamp_millis(bucket.0) {
                Some(dt) => FieldValue::Str(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                None => FieldValue::Int(bucket.0),
            },
            BucketLabel::EpochMillis => FieldValue::Int(bucket.0),
            BucketLabel::EpochSeconds => FieldValue::Int(bucket.0.div_euclid(1_000)),
        }
    }
}
