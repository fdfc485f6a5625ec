mod engine;
pub mod ops;
mod output;
mod request;

pub use engine::{COUNT_FIELD, DURATION_FIELD, ReductionEngine, SAMPLES_FIELD};
pub use output::ReductionOutput;
pub use request::{ReductionOp, ReductionRequest};

#[cfg(test)]
mod engine_test;
