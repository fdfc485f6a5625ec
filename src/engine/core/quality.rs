use serde::Serialize;
use tracing::warn;

use crate::engine::errors::ReduceError;
use crate::shared::config::DataQualityPolicy;

/// Why a record was left out of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    MissingGroupField,
    MissingTarget,
    NonNumericTarget,
    InvalidTimestamp,
    MalformedVector,
}

/// Per-call counts of records with unusable fields under skip-and-count.
///
/// Every counter except `non_numeric_target` counts records left out of the
/// result entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipReport {
    pub missing_group_field: usize,
    pub missing_target: usize,
    /// Records whose target was not numeric. Value reductions leave them out;
    /// `count_where` and `sum_time_where` still evaluate them as the
    /// condition failing.
    pub non_numeric_target: usize,
    pub invalid_timestamp: usize,
    pub malformed_vector: usize,
}

impl SkipReport {
    pub fn record(&mut self, reason: SkipReason) {
        *self.slot(reason) += 1;
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        match reason {
            SkipReason::MissingGroupField => self.missing_group_field,
            SkipReason::MissingTarget => self.missing_target,
            SkipReason::NonNumericTarget => self.non_numeric_target,
            SkipReason::InvalidTimestamp => self.invalid_timestamp,
            SkipReason::MalformedVector => self.malformed_vector,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_group_field
            + self.missing_target
            + self.non_numeric_target
            + self.invalid_timestamp
            + self.malformed_vector
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn slot(&mut self, reason: SkipReason) -> &mut usize {
        match reason {
            SkipReason::MissingGroupField => &mut self.missing_group_field,
            SkipReason::MissingTarget => &mut self.missing_target,
            SkipReason::NonNumericTarget => &mut self.non_numeric_target,
            SkipReason::InvalidTimestamp => &mut self.invalid_timestamp,
            SkipReason::MalformedVector => &mut self.malformed_vector,
        }
    }
}

/// Applies the configured data-quality policy to per-record problems.
#[derive(Debug)]
pub struct QualityGate {
    policy: DataQualityPolicy,
    report: SkipReport,
}

impl QualityGate {
    pub fn new(policy: DataQualityPolicy) -> Self {
        Self {
            policy,
            report: SkipReport::default(),
        }
    }

    pub fn policy(&self) -> DataQualityPolicy {
        self.policy
    }

    /// Counts the record under skip-and-count, or returns its error under fail-fast.
    pub fn reject<F>(&mut self, reason: SkipReason, error: F) -> Result<(), ReduceError>
    where
        F: FnOnce() -> ReduceError,
    {
        match self.policy {
            DataQualityPolicy::SkipAndCount => {
                self.report.record(reason);
                Ok(())
            }
            DataQualityPolicy::FailFast => Err(error()),
        }
    }

    pub fn report(&self) -> &SkipReport {
        &self.report
    }

    pub fn finish(self, operation: &str) -> SkipReport {
        if !self.report.is_empty() {
            warn!(
                target: "telemetry_refiner::engine",
                operation,
                skipped = self.report.total(),
                "records skipped during reduction: {:?}",
                self.report
            );
        }
        self.report
    }
}
