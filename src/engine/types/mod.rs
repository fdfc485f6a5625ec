mod record;

pub use record::Record;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    List,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "Null",
            ValueKind::Boolean => "Boolean",
            ValueKind::Integer => "Integer",
            ValueKind::Float => "Float",
            ValueKind::String => "String",
            ValueKind::List => "List",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamically-typed value of a single record field.
///
/// Telemetry payloads are loosely typed: the same field may arrive as a number
/// on one row and as numeric text on the next, and list-valued readings are
/// often shipped as strings such as `"[1, 4, 532.2]"`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<f64>),
}

impl FieldValue {
    /// Float result that degrades to `Null` when the value is not finite.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            FieldValue::Float(value)
        } else {
            FieldValue::Null
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Null => ValueKind::Null,
            FieldValue::Bool(_) => ValueKind::Boolean,
            FieldValue::Int(_) => ValueKind::Integer,
            FieldValue::Float(_) => ValueKind::Float,
            FieldValue::Str(_) => ValueKind::String,
            FieldValue::List(_) => ValueKind::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric coercion used by every reduction.
    ///
    /// Numeric text is accepted, booleans and lists are not, and non-finite
    /// results are rejected so a stray `"NaN"` cannot poison an aggregate.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Int(i) => *i as f64,
            FieldValue::Float(f) => *f,
            FieldValue::Str(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn to_string_repr(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Str(s) => s.clone(),
            FieldValue::List(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Bool(b) => JsonValue::Bool(*b),
            FieldValue::Int(i) => JsonValue::Number(Number::from(*i)),
            FieldValue::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::Str(s) => JsonValue::String(s.clone()),
            FieldValue::List(values) => JsonValue::Array(
                values
                    .iter()
                    .map(|v| {
                        Number::from_f64(*v)
                            .map(JsonValue::Number)
                            .unwrap_or(JsonValue::Null)
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_repr())
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(num) => {
                if let Some(i) = num.as_i64() {
                    FieldValue::Int(i)
                } else if let Some(f) = num.as_f64() {
                    // u64 beyond i64::MAX lands here as well
                    FieldValue::Float(f)
                } else {
                    FieldValue::Str(num.to_string())
                }
            }
            JsonValue::String(s) => FieldValue::Str(s),
            JsonValue::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(JsonValue::as_f64).collect();
                match numbers {
                    Some(values) => FieldValue::List(values),
                    None => FieldValue::Str(
                        serde_json::to_string(&JsonValue::Array(items))
                            .unwrap_or_else(|_| "[]".to_string()),
                    ),
                }
            }
            JsonValue::Object(_) => FieldValue::Str(
                serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string()),
            ),
        }
    }
}

impl From<&FieldValue> for JsonValue {
    fn from(value: &FieldValue) -> Self {
        value.to_json()
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(value: Vec<f64>) -> Self {
        FieldValue::List(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            FieldValue::Float(_) => serializer.serialize_unit(),
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::List(_) => self.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json = JsonValue::deserialize(deserializer)?;
        Ok(FieldValue::from(json))
    }
}
