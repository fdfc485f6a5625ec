use crate::engine::types::{FieldValue, Record};
use chrono::{DateTime, Duration};
use serde_json::Value;

pub struct RecordFactory {
    params: Record,
}

impl RecordFactory {
    pub fn new() -> Self {
        let params = Record::new()
            .with("machine", "m1")
            .with("timestamp", "2024-01-15T14:00:00Z")
            .with("value", 1.0);
        Self { params }
    }

    pub fn with(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn create(self) -> Record {
        self.params
    }

    /// One record per value, `step_secs` apart starting at `start` (RFC 3339).
    pub fn create_series(self, start: &str, step_secs: i64, values: &[f64]) -> Vec<Record> {
        let start = DateTime::parse_from_rfc3339(start).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let ts = start + Duration::seconds(step_secs * i as i64);
                let mut record = self.params.clone();
                record.insert("timestamp", ts.to_rfc3339());
                record.insert("value", *v);
                record
            })
            .collect()
    }
}

/// Records from a JSON array of objects.
pub fn records_from(value: Value) -> Vec<Record> {
    value
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|item| Record::from_json(item.clone()).expect("expected a JSON object"))
        .collect()
}
