use thiserror::Error;
use tracing::{debug, error};

/// Errors raised by the reduction engine.
///
/// Configuration errors (grouping, frequency, operator, vector length) abort
/// the call under every policy. The per-record variants are only returned
/// when the engine runs with the fail-fast data-quality policy; otherwise
/// the offending record is skipped and counted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReduceError {
    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Invalid frequency '{0}': expected <integer><unit> with unit second, minute, hour or day")]
    InvalidFrequency(String),

    #[error("Invalid timestamp in field '{field}': {reason}")]
    InvalidTimestamp { field: String, reason: String },

    #[error("Invalid operator '{0}': expected one of >, >=, <, <=, ==, !=")]
    InvalidOperator(String),

    #[error("Vector parse error: {0}")]
    VectorParse(String),

    #[error("Vector length mismatch in group [{group}]: expected {expected}, found {found}")]
    VectorLengthMismatch {
        group: String,
        expected: usize,
        found: usize,
    },

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Non-numeric value in field '{field}': {value}")]
    NonNumericValue { field: String, value: String },
}

impl ReduceError {
    /// Structural errors are independent of the data-quality policy.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ReduceError::InvalidGrouping(_)
                | ReduceError::InvalidFrequency(_)
                | ReduceError::InvalidOperator(_)
                | ReduceError::VectorLengthMismatch { .. }
        )
    }

    pub fn log_error(&self) {
        match self {
            ReduceError::InvalidGrouping(e) => {
                error!("Invalid grouping: {}", e);
            }
            ReduceError::InvalidFrequency(f) => {
                error!("Invalid frequency: {}", f);
            }
            ReduceError::InvalidTimestamp { field, reason } => {
                error!("Invalid timestamp in field {}", field);
                debug!("Invalid timestamp details: {}", reason);
            }
            ReduceError::InvalidOperator(op) => {
                error!("Invalid operator: {}", op);
            }
            ReduceError::VectorParse(e) => {
                error!("Vector parse error");
                debug!("Vector parse error details: {}", e);
            }
            ReduceError::VectorLengthMismatch {
                group,
                expected,
                found,
            } => {
                error!("Vector length mismatch in group [{}]", group);
                debug!("Expected length {}, found {}", expected, found);
            }
            ReduceError::MissingField(field) => {
                error!("Missing field: {}", field);
            }
            ReduceError::NonNumericValue { field, value } => {
                error!("Non-numeric value in field {}", field);
                debug!("Offending value: {}", value);
            }
        }
    }
}
