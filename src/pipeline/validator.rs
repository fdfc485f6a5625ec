use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::engine::core::vector::VectorParser;
use crate::engine::types::{FieldValue, Record};
use crate::shared::time::TimeParser;

/// Checks fetched records against a declared structure.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, records: &[Record], structure: &StructureSpec) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Number,
    Integer,
    String,
    Boolean,
    /// Numeric array or string-encoded numeric list
    List,
    /// Anything the timestamp parser accepts
    Timestamp,
    Any,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::List => "list",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Any => "any",
        }
    }

    pub fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            FieldKind::Number => match value {
                FieldValue::Int(_) => true,
                FieldValue::Float(f) => f.is_finite(),
                _ => false,
            },
            FieldKind::Integer => matches!(value, FieldValue::Int(_)),
            FieldKind::String => matches!(value, FieldValue::Str(_)),
            FieldKind::Boolean => matches!(value, FieldValue::Bool(_)),
            FieldKind::List => match value {
                FieldValue::List(_) => true,
                FieldValue::Str(s) => VectorParser::parse(s).is_ok(),
                _ => false,
            },
            FieldKind::Timestamp => TimeParser::field_to_epoch_millis(value).is_ok(),
            FieldKind::Any => true,
        }
    }
}

/// Expected kind of one field; optional fields may be absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub optional: bool,
}

impl FieldSpec {
    pub fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    pub fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            optional: true,
        }
    }
}

impl FromStr for FieldSpec {
    type Err = String;

    /// `"number"`, `"timestamp?"`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, optional) = match s.strip_suffix('?') {
            Some(rest) => (rest.trim_end(), true),
            None => (s, false),
        };
        let kind = match name.to_ascii_lowercase().as_str() {
            "number" | "float" => FieldKind::Number,
            "integer" | "int" => FieldKind::Integer,
            "string" | "str" => FieldKind::String,
            "boolean" | "bool" => FieldKind::Boolean,
            "list" | "vector" => FieldKind::List,
            "timestamp" | "datetime" => FieldKind::Timestamp,
            "any" => FieldKind::Any,
            other => return Err(format!("unknown field kind '{other}'")),
        };
        Ok(Self { kind, optional })
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if self.optional {
            f.write_str("?")?;
        }
        Ok(())
    }
}

impl Serialize for FieldSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Field name to expected kind; fields not listed are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureSpec {
    fields: IndexMap<String, FieldSpec>,
}

impl StructureSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(field.into(), spec);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// First structural violation found in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub record_index: usize,
    pub field: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {} field '{}': {}",
            self.record_index, self.field, self.reason
        )
    }
}

/// Validator for [`StructureSpec`] declarations
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn check(records: &[Record], structure: &StructureSpec) -> Result<(), Violation> {
        for (record_index, record) in records.iter().enumerate() {
            for (field, spec) in structure.fields() {
                let violation = |reason: String| Violation {
                    record_index,
                    field: field.to_string(),
                    reason,
                };
                match record.get(field) {
                    None | Some(FieldValue::Null) if spec.optional => {}
                    None => return Err(violation("field is missing".to_string())),
                    Some(value) if !spec.kind.accepts(value) => {
                        return Err(violation(format!(
                            "expected {}, found {} '{}'",
                            spec.kind.as_str(),
                            value.kind(),
                            value
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Validator for SchemaValidator {
    async fn validate(&self, records: &[Record], structure: &StructureSpec) -> bool {
        match Self::check(records, structure) {
            Ok(()) => true,
            Err(violation) => {
                warn!(%violation, "telemetry failed structure validation");
                false
            }
        }
    }
}
