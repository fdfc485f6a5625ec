use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::errors::ReduceError;
use crate::engine::types::{FieldValue, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
        }
    }

    #[inline]
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Gte => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Lte => lhs <= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Neq => lhs != rhs,
        }
    }
}

impl FromStr for CompareOp {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Gte),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Lte),
            "==" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Neq),
            _ => Err(ReduceError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CompareOp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CompareOp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of testing one record against a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Holds,
    Fails,
    /// Target field absent from the record
    Missing,
    /// Target field present but not numeric; never holds
    NonNumeric,
}

impl ConditionOutcome {
    #[inline]
    pub fn holds(&self) -> bool {
        matches!(self, ConditionOutcome::Holds)
    }
}

/// Numeric comparison of a record field against a fixed threshold
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    field: String,
    operation: CompareOp,
    value: f64,
}

impl ConditionEvaluator {
    pub fn new(field: impl Into<String>, operation: CompareOp, value: f64) -> Self {
        Self {
            field: field.into(),
            operation,
            value,
        }
    }

    /// Builds an evaluator from an operator string such as `">="`.
    pub fn parse(field: impl Into<String>, operator: &str, value: f64) -> Result<Self, ReduceError> {
        Ok(Self::new(field, operator.parse()?, value))
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operation(&self) -> CompareOp {
        self.operation
    }

    pub fn evaluate_value(&self, value: Option<&FieldValue>) -> ConditionOutcome {
        match value {
            None => ConditionOutcome::Missing,
            Some(v) => match v.as_f64() {
                Some(num) if self.operation.apply(num, self.value) => ConditionOutcome::Holds,
                Some(_) => ConditionOutcome::Fails,
                None => ConditionOutcome::NonNumeric,
            },
        }
    }

    pub fn evaluate(&self, record: &Record) -> ConditionOutcome {
        self.evaluate_value(record.get(&self.field))
    }
}
