use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use crate::engine::core::quality::SkipReport;
use crate::engine::types::Record;

/// Result rows of one reduction call plus the records it had to leave out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReductionOutput {
    pub rows: Vec<Record>,
    pub skipped: SkipReport,
}

impl ReductionOutput {
    pub fn new(rows: Vec<Record>, skipped: SkipReport) -> Self {
        Self { rows, skipped }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.total()
    }

    pub fn to_json(&self) -> JsonValue {
        json!({
            "rows": self.rows.iter().map(Record::to_json).collect::<Vec<_>>(),
            "skipped": {
                "total": self.skipped.total(),
                "missing_group_field": self.skipped.missing_group_field,
                "missing_target": self.skipped.missing_target,
                "non_numeric_target": self.skipped.non_numeric_target,
                "invalid_timestamp": self.skipped.invalid_timestamp,
                "malformed_vector": self.skipped.malformed_vector,
            },
        })
    }
}
