use indexmap::IndexMap;
use indexmap::map::Entry;

use super::group_key::{GroupKey, KeyError};
use crate::engine::core::quality::{QualityGate, SkipReason};
use crate::engine::errors::ReduceError;
use crate::engine::types::{FieldValue, Record};

/// Records sharing one group key, in input order.
#[derive(Debug, Clone)]
pub struct Partition<'a> {
    key: GroupKey,
    /// Grouping values as they appeared on the first record of the group
    key_values: Vec<FieldValue>,
    records: Vec<&'a Record>,
}

impl<'a> Partition<'a> {
    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fresh output row holding only the grouping fields.
    pub fn key_record(&self, group_by: &[String]) -> Record {
        let mut record = Record::with_capacity(group_by.len() + 1);
        for (name, value) in group_by.iter().zip(&self.key_values) {
            record.insert(name.clone(), value.clone());
        }
        record
    }
}

/// Groups in first-appearance order.
#[derive(Debug, Default)]
pub struct Partitioning<'a> {
    groups: IndexMap<GroupKey, Partition<'a>>,
}

impl<'a> Partitioning<'a> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &GroupKey) -> Option<&Partition<'a>> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition<'a>> {
        self.groups.values()
    }
}

impl<'a> IntoIterator for Partitioning<'a> {
    type Item = Partition<'a>;
    type IntoIter = indexmap::map::IntoValues<GroupKey, Partition<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_values()
    }
}

/// Splits records into partitions by a fixed list of grouping fields
#[derive(Debug, Clone)]
pub struct Partitioner {
    group_by: Vec<String>,
}

impl Partitioner {
    pub fn new(group_by: &[String]) -> Result<Self, ReduceError> {
        if group_by.is_empty() {
            return Err(ReduceError::InvalidGrouping(
                "at least one grouping field is required".to_string(),
            ));
        }
        if let Some(blank) = group_by.iter().find(|name| name.trim().is_empty()) {
            return Err(ReduceError::InvalidGrouping(format!(
                "grouping field names must be non-empty, got '{blank}'"
            )));
        }
        Ok(Self {
            group_by: group_by.to_vec(),
        })
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Every grouping field must appear on the first record; later records
    /// lacking one are routed through the quality gate.
    pub fn partition<'a>(
        &self,
        records: &'a [Record],
        gate: &mut QualityGate,
    ) -> Result<Partitioning<'a>, ReduceError> {
        if let Some(first) = records.first() {
            let absent = self
                .group_by
                .iter()
                .find(|name| !first.contains(name.as_str()));
            if let Some(absent) = absent {
                return Err(ReduceError::InvalidGrouping(format!(
                    "grouping field '{absent}' is not present in the first record"
                )));
            }
        }

        let mut groups: IndexMap<GroupKey, Partition<'a>> = IndexMap::new();

        for record in records {
            let key = match GroupKey::from_record(&self.group_by, record) {
                Ok(key) => key,
                Err(KeyError::MissingField(field)) => {
                    gate.reject(SkipReason::MissingGroupField, || {
                        ReduceError::InvalidGrouping(format!(
                            "grouping field '{field}' is missing from a record"
                        ))
                    })?;
                    continue;
                }
            };

            match groups.entry(key) {
                Entry::Occupied(mut slot) => slot.get_mut().records.push(record),
                Entry::Vacant(slot) => {
                    let key_values = self
                        .group_by
                        .iter()
                        .map(|name| record.get(name).cloned().unwrap_or(FieldValue::Null))
                        .collect();
                    let key = slot.key().clone();
                    slot.insert(Partition {
                        key,
                        key_values,
                        records: vec![record],
                    });
                }
            }
        }

        Ok(Partitioning { groups })
    }
}
