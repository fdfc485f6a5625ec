use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState as AHashRandomState;

use crate::engine::types::{FieldValue, Record};

/// Grouping identity of one field value.
///
/// Values of different kinds never share a group, except integral floats
/// which group with the equal integer. Floats compare by bit pattern.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum GroupValue {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    List(Vec<u64>),
}

impl GroupValue {
    /// Grouping identity of a field value; `Null` has none.
    pub fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(GroupValue::Bool(*b)),
            FieldValue::Int(i) => Some(GroupValue::Int(*i)),
            FieldValue::Float(f) => {
                // 5.0 and 5 land in the same group
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(GroupValue::Int(*f as i64))
                } else {
                    Some(GroupValue::Float(float_bits(*f)))
                }
            }
            FieldValue::Str(s) => Some(GroupValue::Str(s.clone())),
            FieldValue::List(values) => {
                Some(GroupValue::List(values.iter().map(|v| float_bits(*v)).collect()))
            }
        }
    }

    pub fn to_string_repr(&self) -> String {
        match self {
            GroupValue::Bool(b) => b.to_string(),
            GroupValue::Int(i) => i.to_string(),
            GroupValue::Float(bits) => f64::from_bits(*bits).to_string(),
            GroupValue::Str(s) => s.clone(),
            GroupValue::List(bits) => {
                let parts: Vec<String> = bits
                    .iter()
                    .map(|b| f64::from_bits(*b).to_string())
                    .collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }
}

/// -0.0 folds into 0.0 and every NaN into one canonical pattern.
fn float_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0_f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

/// Ordered tuple of grouping values drawn from a record.
#[derive(Clone, Debug, Eq)]
pub struct GroupKey {
    // Precomputed 64-bit hash to speed up map lookups
    pub(crate) prehash: u64,
    pub(crate) groups: Vec<GroupValue>,
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        // prehash is a cache; equality must be defined by the actual key fields
        self.groups == other.groups
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prehash.hash(state);
    }
}

/// Reason a record could not produce a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    MissingField(String),
}

impl GroupKey {
    pub fn new(groups: Vec<GroupValue>) -> Self {
        let prehash = Self::compute_prehash(&groups);
        Self { prehash, groups }
    }

    /// Construct a GroupKey from a record; a missing or null grouping field is an error.
    pub fn from_record(group_by: &[String], record: &Record) -> Result<Self, KeyError> {
        let mut groups: Vec<GroupValue> = Vec::with_capacity(group_by.len());
        for name in group_by {
            let value = record
                .get(name)
                .and_then(GroupValue::from_field)
                .ok_or_else(|| KeyError::MissingField(name.clone()))?;
            groups.push(value);
        }
        Ok(Self::new(groups))
    }

    #[inline]
    fn compute_prehash(groups: &[GroupValue]) -> u64 {
        let mut hasher = AHashRandomState::with_seeds(0, 0, 0, 0).build_hasher();
        for g in groups {
            g.hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn values(&self) -> &[GroupValue] {
        &self.groups
    }

    /// `a, b` rendering used in logs and error messages.
    pub fn display(&self) -> String {
        self.groups
            .iter()
            .map(GroupValue::to_string_repr)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
