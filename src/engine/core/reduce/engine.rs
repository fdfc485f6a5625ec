use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::ops::{CountWhere, Describe, DurationWhere, MaxRow, Mean, Sum, VectorSum};
use super::output::ReductionOutput;
use super::request::{ReductionOp, ReductionRequest};
use crate::engine::core::filter::{ConditionEvaluator, ConditionOutcome};
use crate::engine::core::group::{Partitioner, Partitioning};
use crate::engine::core::quality::{QualityGate, SkipReason};
use crate::engine::core::vector::VectorParser;
use crate::engine::errors::ReduceError;
use crate::engine::types::{FieldValue, Record};
use crate::shared::config::EngineConfig;
use crate::shared::datetime::{Frequency, TimeBucket, TimeBucketer, bucket_of};

pub const COUNT_FIELD: &str = "count";
pub const SAMPLES_FIELD: &str = "samples";
pub const DURATION_FIELD: &str = "duration_seconds";

/// Grouped reductions over loosely-typed telemetry records.
///
/// Every operation partitions its input by the grouping fields, folds a
/// per-partition accumulator and returns freshly built rows. The engine holds
/// no state between calls; the caller's records are never modified.
#[derive(Debug, Clone, Default)]
pub struct ReductionEngine {
    config: EngineConfig,
    bucketer: TimeBucketer,
}

impl ReductionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let bucketer = TimeBucketer::new(config.bucket_label);
        Self { config, bucketer }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the operation selected by `request`.
    pub fn apply(
        &self,
        records: &[Record],
        request: &ReductionRequest,
    ) -> Result<ReductionOutput, ReduceError> {
        let group_by = &request.group_by;
        match &request.op {
            ReductionOp::DownSample {
                target_key,
                timestamp_key,
                frequency,
            } => {
                let frequency = frequency
                    .as_deref()
                    .unwrap_or(self.config.default_frequency.as_str());
                self.down_sample(records, group_by, target_key, timestamp_key, frequency)
            }
            ReductionOp::StatsDescription { target_key } => {
                self.stats_description(records, group_by, target_key)
            }
            ReductionOp::CountWhere {
                target_key,
                compare_value,
                condition_type,
            } => self.count_where(records, group_by, target_key, *compare_value, condition_type),
            ReductionOp::SumTimeWhere {
                target_key,
                timestamp_key,
                compare_value,
                condition_type,
            } => self.sum_time_where(
                records,
                group_by,
                target_key,
                timestamp_key,
                *compare_value,
                condition_type,
            ),
            ReductionOp::SumListYaxis { target_key } => {
                self.sum_list_yaxis(records, group_by, target_key)
            }
            ReductionOp::Sum { target_key } => self.sum(records, group_by, target_key),
            ReductionOp::GetMaxRow { target_key } => {
                self.get_max_row(records, group_by, target_key)
            }
        }
    }

    /// Mean of `target_key` per (group, time bucket), buckets ascending within each group.
    pub fn down_sample(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
        timestamp_key: &str,
        frequency: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let freq = Frequency::parse(frequency)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::new();
        for partition in partitions.iter() {
            let mut buckets: BTreeMap<TimeBucket, Mean> = BTreeMap::new();
            for &record in partition.records() {
                let Some(ts) = timestamp_or_skip(&mut gate, record, timestamp_key)? else {
                    continue;
                };
                let Some(v) = numeric_or_skip(&mut gate, record, target_key)? else {
                    continue;
                };
                buckets.entry(bucket_of(ts, &freq)).or_default().update(v);
            }

            for (bucket, mean) in buckets {
                let mut row = partition.key_record(group_by);
                row.insert(timestamp_key, self.bucketer.label(bucket));
                row.insert(
                    target_key,
                    mean.finalize().map_or(FieldValue::Null, FieldValue::from_f64),
                );
                row.insert(SAMPLES_FIELD, mean.count() as i64);
                rows.push(row);
            }
        }

        Ok(self.finish("down_sample", &partitions, rows, gate))
    }

    /// count, mean, std, min, quartiles and max of `target_key` per group.
    pub fn stats_description(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut describe = Describe::new();
            for &record in partition.records() {
                if let Some(v) = numeric_or_skip(&mut gate, record, target_key)? {
                    describe.update(v);
                }
            }

            let stats = describe.finalize();
            let opt = |v: Option<f64>| v.map_or(FieldValue::Null, FieldValue::from_f64);
            let mut row = partition.key_record(group_by);
            row.insert(COUNT_FIELD, stats.count as i64);
            row.insert("mean", opt(stats.mean));
            row.insert("std", opt(stats.std));
            row.insert("min", opt(stats.min));
            row.insert("25%", opt(stats.q25));
            row.insert("50%", opt(stats.q50));
            row.insert("75%", opt(stats.q75));
            row.insert("max", opt(stats.max));
            rows.push(row);
        }

        Ok(self.finish("stats_description", &partitions, rows, gate))
    }

    /// Number of records per group where `target_key <condition_type> compare_value` holds.
    pub fn count_where(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
        compare_value: f64,
        condition_type: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let condition = ConditionEvaluator::parse(target_key, condition_type, compare_value)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut count = CountWhere::new();
            for &record in partition.records() {
                let outcome = condition.evaluate(record);
                check_outcome(&mut gate, record, target_key, outcome)?;
                count.update(outcome.holds());
            }

            let mut row = partition.key_record(group_by);
            row.insert(COUNT_FIELD, count.finalize());
            rows.push(row);
        }

        Ok(self.finish("count_where", &partitions, rows, gate))
    }

    /// Seconds per group during which the condition held continuously.
    ///
    /// Records are sorted by timestamp first (stable, so ties keep input
    /// order). A non-numeric target counts as the condition failing and
    /// breaks the run; records with a missing target or timestamp are left out.
    pub fn sum_time_where(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
        timestamp_key: &str,
        compare_value: f64,
        condition_type: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let condition = ConditionEvaluator::parse(target_key, condition_type, compare_value)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut samples: Vec<(i64, bool)> = Vec::with_capacity(partition.len());
            for &record in partition.records() {
                let Some(ts) = timestamp_or_skip(&mut gate, record, timestamp_key)? else {
                    continue;
                };
                let outcome = condition.evaluate(record);
                check_outcome(&mut gate, record, target_key, outcome)?;
                if outcome == ConditionOutcome::Missing {
                    continue;
                }
                samples.push((ts, outcome.holds()));
            }
            samples.sort_by_key(|(ts, _)| *ts);

            let mut duration = DurationWhere::new();
            for (ts, holds) in samples {
                duration.update(ts, holds);
            }

            let mut row = partition.key_record(group_by);
            row.insert(DURATION_FIELD, duration.finalize_seconds());
            rows.push(row);
        }

        Ok(self.finish("sum_time_where", &partitions, rows, gate))
    }

    /// Elementwise sum of the numeric lists stored in `target_key`.
    /// A sum that overflows to infinity is reported as `null`, like scalar `sum`.
    pub fn sum_list_yaxis(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut acc = VectorSum::new();
            for &record in partition.records() {
                let Some(value) = record.get(target_key) else {
                    gate.reject(SkipReason::MissingTarget, || {
                        ReduceError::MissingField(target_key.to_string())
                    })?;
                    continue;
                };
                let vector = match VectorParser::from_field(value) {
                    Ok(vector) => vector,
                    Err(e) => {
                        gate.reject(SkipReason::MalformedVector, || e)?;
                        continue;
                    }
                };
                acc.update(vector)
                    .map_err(|(expected, found)| ReduceError::VectorLengthMismatch {
                        group: partition.key().display(),
                        expected,
                        found,
                    })?;
            }

            if let Some(total) = acc.finalize() {
                let mut row = partition.key_record(group_by);
                if total.iter().all(|v| v.is_finite()) {
                    row.insert(target_key, FieldValue::List(total));
                } else {
                    warn!(
                        target: "telemetry_refiner::engine",
                        group = %partition.key().display(),
                        field = target_key,
                        "vector sum overflowed; emitting null"
                    );
                    row.insert(target_key, FieldValue::Null);
                }
                rows.push(row);
            }
        }

        Ok(self.finish("sum_list_yaxis", &partitions, rows, gate))
    }

    /// Scalar sum of `target_key` per group; 0 when no value was numeric.
    pub fn sum(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut sum = Sum::new();
            for &record in partition.records() {
                if let Some(v) = numeric_or_skip(&mut gate, record, target_key)? {
                    sum.update(v);
                }
            }

            let mut row = partition.key_record(group_by);
            row.insert(target_key, FieldValue::from_f64(sum.finalize()));
            rows.push(row);
        }

        Ok(self.finish("sum", &partitions, rows, gate))
    }

    /// The full record holding each group's largest `target_key`.
    pub fn get_max_row(
        &self,
        records: &[Record],
        group_by: &[String],
        target_key: &str,
    ) -> Result<ReductionOutput, ReduceError> {
        let partitioner = Partitioner::new(group_by)?;
        let mut gate = self.gate();
        let partitions = partitioner.partition(records, &mut gate)?;

        let mut rows = Vec::with_capacity(partitions.len());
        for partition in partitions.iter() {
            let mut max = MaxRow::new();
            for &record in partition.records() {
                if let Some(v) = numeric_or_skip(&mut gate, record, target_key)? {
                    max.update(v, record);
                }
            }
            if let Some(best) = max.finalize() {
                rows.push(best.clone());
            }
        }

        Ok(self.finish("get_max_row", &partitions, rows, gate))
    }

    fn gate(&self) -> QualityGate {
        QualityGate::new(self.config.data_quality)
    }

    fn finish(
        &self,
        operation: &str,
        partitions: &Partitioning<'_>,
        rows: Vec<Record>,
        gate: QualityGate,
    ) -> ReductionOutput {
        let skipped = gate.finish(operation);
        debug!(
            target: "telemetry_refiner::engine",
            operation,
            groups = partitions.len(),
            rows = rows.len(),
            skipped = skipped.total(),
            "reduction complete"
        );
        ReductionOutput::new(rows, skipped)
    }
}

/// Numeric value of `field`, or `None` once the record has been counted as skipped.
fn numeric_or_skip(
    gate: &mut QualityGate,
    record: &Record,
    field: &str,
) -> Result<Option<f64>, ReduceError> {
    match record.get(field) {
        None => {
            gate.reject(SkipReason::MissingTarget, || {
                ReduceError::MissingField(field.to_string())
            })?;
            Ok(None)
        }
        Some(value) => match value.as_f64() {
            Some(v) => Ok(Some(v)),
            None => {
                gate.reject(SkipReason::NonNumericTarget, || {
                    ReduceError::NonNumericValue {
                        field: field.to_string(),
                        value: value.to_string_repr(),
                    }
                })?;
                Ok(None)
            }
        },
    }
}

fn timestamp_or_skip(
    gate: &mut QualityGate,
    record: &Record,
    field: &str,
) -> Result<Option<i64>, ReduceError> {
    match TimeBucketer::timestamp_of(field, record.get(field)) {
        Ok(ts) => Ok(Some(ts)),
        Err(e) => {
            gate.reject(SkipReason::InvalidTimestamp, || e)?;
            Ok(None)
        }
    }
}

/// Reports condition outcomes that involve unusable data.
fn check_outcome(
    gate: &mut QualityGate,
    record: &Record,
    field: &str,
    outcome: ConditionOutcome,
) -> Result<(), ReduceError> {
    match outcome {
        ConditionOutcome::Holds | ConditionOutcome::Fails => Ok(()),
        ConditionOutcome::Missing => gate.reject(SkipReason::MissingTarget, || {
            ReduceError::MissingField(field.to_string())
        }),
        ConditionOutcome::NonNumeric => gate.reject(SkipReason::NonNumericTarget, || {
            ReduceError::NonNumericValue {
                field: field.to_string(),
                value: record
                    .get(field)
                    .map(FieldValue::to_string_repr)
                    .unwrap_or_default(),
            }
        }),
    }
}
