pub mod condition;

pub use condition::{CompareOp, ConditionEvaluator, ConditionOutcome};
