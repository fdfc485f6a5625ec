use serde_json::json;

use crate::engine::core::reduce::{
    COUNT_FIELD, DURATION_FIELD, ReductionEngine, ReductionOp, ReductionRequest, SAMPLES_FIELD,
};
use crate::engine::core::quality::SkipReason;
use crate::engine::errors::ReduceError;
use crate::engine::types::{FieldValue, Record};
use crate::logging;
use crate::shared::config::{DataQualityPolicy, EngineConfig};
use crate::shared::datetime::BucketLabel;
use crate::test_helpers::factories::{RecordFactory, records_from};
use crate::test_helpers::factory::Factory;

fn by(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

fn fail_fast() -> ReductionEngine {
    ReductionEngine::new(EngineConfig {
        data_quality: DataQualityPolicy::FailFast,
        ..EngineConfig::default()
    })
}

fn num(row: &Record, field: &str) -> f64 {
    row.get(field)
        .and_then(FieldValue::as_f64)
        .unwrap_or_else(|| panic!("field {field} missing or not numeric in {row:?}"))
}

// ---------------------------------------------------------------------------
// down_sample
// ---------------------------------------------------------------------------

#[test]
fn down_sample_averages_per_aligned_bucket() {
    logging::init_for_tests();
    let records = RecordFactory::new().create_series("2024-01-15T14:00:00Z", 30, &[1.0, 2.0, 3.0, 4.0, 5.0]);
    let engine = ReductionEngine::default();

    let out = engine
        .down_sample(&records, &by(&["machine"]), "value", "timestamp", "1T")
        .unwrap();

    let rows: Vec<_> = out.rows.iter().map(Record::to_json).collect();
    assert_eq!(
        rows,
        vec![
            json!({"machine": "m1", "timestamp": "2024-01-15T14:00:00Z", "value": 1.5, "samples": 2}),
            json!({"machine": "m1", "timestamp": "2024-01-15T14:01:00Z", "value": 3.5, "samples": 2}),
            json!({"machine": "m1", "timestamp": "2024-01-15T14:02:00Z", "value": 5.0, "samples": 1}),
        ]
    );
    assert!(out.skipped.is_empty());
}

#[test]
fn down_sample_orders_buckets_within_each_group() {
    let records = records_from(json!([
        {"g": "B", "ts": "2024-01-15T14:10:00Z", "v": 10},
        {"g": "A", "ts": "2024-01-15T14:20:00Z", "v": 1},
        {"g": "B", "ts": "2024-01-15T14:00:00Z", "v": 20},
        {"g": "A", "ts": "2024-01-15T14:00:05Z", "v": 3},
    ]));
    let engine = ReductionEngine::new(EngineConfig {
        bucket_label: BucketLabel::EpochSeconds,
        ..EngineConfig::default()
    });

    let out = engine
        .down_sample(&records, &by(&["g"]), "v", "ts", "5min")
        .unwrap();

    let base = 1_705_327_200_i64;
    let got: Vec<(String, i64, f64)> = out
        .rows
        .iter()
        .map(|r| {
            (
                r.get("g").unwrap().to_string_repr(),
                r.get("ts").and_then(FieldValue::as_i64).unwrap(),
                num(r, "v"),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("B".to_string(), base, 20.0),
            ("B".to_string(), base + 600, 10.0),
            ("A".to_string(), base, 3.0),
            ("A".to_string(), base + 1_200, 1.0),
        ]
    );
}

#[test]
fn down_sample_counts_unusable_records() {
    let records = records_from(json!([
        {"g": "A", "ts": "2024-01-15T14:00:00Z", "v": 2},
        {"g": "A", "ts": "not a time", "v": 4},
        {"g": "A", "v": 4},
        {"g": "A", "ts": "2024-01-15T14:00:10Z"},
        {"g": "A", "ts": "2024-01-15T14:00:20Z", "v": "high"},
        {"ts": "2024-01-15T14:00:20Z", "v": 1},
    ]));

    let out = ReductionEngine::default()
        .down_sample(&records, &by(&["g"]), "v", "ts", "1T")
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(num(&out.rows[0], "v"), 2.0);
    assert_eq!(out.skipped.count(SkipReason::InvalidTimestamp), 2);
    assert_eq!(out.skipped.count(SkipReason::MissingTarget), 1);
    assert_eq!(out.skipped.count(SkipReason::NonNumericTarget), 1);
    assert_eq!(out.skipped.count(SkipReason::MissingGroupField), 1);
    assert_eq!(out.skipped_total(), 5);
}

#[test]
fn down_sample_keeps_machines_apart() {
    let mut records = Factory::record().create_series("2024-01-15T14:00:00Z", 60, &[1.0, 3.0]);
    records.extend(
        Factory::record()
            .with("machine", "m2")
            .create_series("2024-01-15T14:00:00Z", 60, &[10.0, 30.0]),
    );

    let out = ReductionEngine::default()
        .down_sample(&records, &by(&["machine"]), "value", "timestamp", "2T")
        .unwrap();

    let means: Vec<(String, f64)> = out
        .rows
        .iter()
        .map(|r| (r.get("machine").unwrap().to_string_repr(), num(r, "value")))
        .collect();
    assert_eq!(means, vec![("m1".to_string(), 2.0), ("m2".to_string(), 20.0)]);
}

#[test]
fn down_sample_rejects_bad_frequency_before_reading_data() {
    let records = RecordFactory::new().create_series("2024-01-15T14:00:00Z", 60, &[1.0]);
    let err = ReductionEngine::default()
        .down_sample(&records, &by(&["machine"]), "value", "timestamp", "0T")
        .unwrap_err();
    assert_eq!(err, ReduceError::InvalidFrequency("0T".into()));
}

#[test]
fn apply_uses_default_frequency_when_none_given() {
    let records = RecordFactory::new().create_series("2024-01-15T14:00:00Z", 20, &[1.0, 2.0, 3.0, 4.0]);
    let engine = ReductionEngine::new(EngineConfig {
        default_frequency: "1H".into(),
        ..EngineConfig::default()
    });
    let request = ReductionRequest::new(
        by(&["machine"]),
        ReductionOp::DownSample {
            target_key: "value".into(),
            timestamp_key: "timestamp".into(),
            frequency: None,
        },
    );

    let out = engine.apply(&records, &request).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(num(&out.rows[0], "value"), 2.5);
    assert_eq!(out.rows[0].get(SAMPLES_FIELD), Some(&FieldValue::Int(4)));
}

// ---------------------------------------------------------------------------
// stats_description
// ---------------------------------------------------------------------------

#[test]
fn stats_description_summarises_each_group() {
    let records = records_from(json!([
        {"g": "A", "v": 4},
        {"g": "B", "v": 7},
        {"g": "A", "v": 1},
        {"g": "A", "v": 3},
        {"g": "A", "v": 2},
    ]));

    let out = ReductionEngine::default()
        .stats_description(&records, &by(&["g"]), "v")
        .unwrap();
    assert_eq!(out.len(), 2);

    let a = &out.rows[0];
    assert_eq!(a.get("g"), Some(&FieldValue::Str("A".into())));
    assert_eq!(a.get(COUNT_FIELD), Some(&FieldValue::Int(4)));
    assert_eq!(num(a, "mean"), 2.5);
    assert!((num(a, "std") - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    assert_eq!(num(a, "min"), 1.0);
    assert_eq!(num(a, "25%"), 1.75);
    assert_eq!(num(a, "50%"), 2.5);
    assert_eq!(num(a, "75%"), 3.25);
    assert_eq!(num(a, "max"), 4.0);

    // A single sample has no sample deviation
    let b = &out.rows[1];
    assert_eq!(b.get(COUNT_FIELD), Some(&FieldValue::Int(1)));
    assert_eq!(b.get("std"), Some(&FieldValue::Null));
    assert_eq!(num(b, "50%"), 7.0);
}

#[test]
fn stats_description_with_only_unusable_values() {
    let records = records_from(json!([{"g": "A", "v": "n/a"}]));
    let out = ReductionEngine::default()
        .stats_description(&records, &by(&["g"]), "v")
        .unwrap();

    let row = &out.rows[0];
    assert_eq!(row.get(COUNT_FIELD), Some(&FieldValue::Int(0)));
    assert_eq!(row.get("mean"), Some(&FieldValue::Null));
    assert_eq!(row.get("max"), Some(&FieldValue::Null));
    assert_eq!(out.skipped.non_numeric_target, 1);
}

// ---------------------------------------------------------------------------
// count_where
// ---------------------------------------------------------------------------

#[test]
fn count_where_counts_matching_records() {
    let records = records_from(json!([
        {"g": "A", "v": 5},
        {"g": "A", "v": 5},
        {"g": "A", "v": 3},
    ]));

    let out = ReductionEngine::default()
        .count_where(&records, &by(&["g"]), "v", 5.0, "==")
        .unwrap();

    let rows: Vec<_> = out.rows.iter().map(Record::to_json).collect();
    assert_eq!(rows, vec![json!({"g": "A", "count": 2})]);
}

#[test]
fn count_where_keeps_groups_with_no_match() {
    let records = records_from(json!([
        {"g": "A", "v": 1},
        {"g": "B", "v": 9},
        {"g": "B", "v": "9.5"},
    ]));

    let out = ReductionEngine::default()
        .count_where(&records, &by(&["g"]), "v", 8.0, ">")
        .unwrap();

    let counts: Vec<_> = out.rows.iter().map(|r| r.get(COUNT_FIELD).cloned()).collect();
    assert_eq!(
        counts,
        vec![Some(FieldValue::Int(0)), Some(FieldValue::Int(2))]
    );
}

#[test]
fn count_where_evaluates_non_numeric_targets_as_failing() {
    let records = records_from(json!([
        {"g": "A", "v": "n/a"},
        {"g": "A", "v": 2},
    ]));

    let out = ReductionEngine::default()
        .count_where(&records, &by(&["g"]), "v", 0.0, "!=")
        .unwrap();

    assert_eq!(out.rows[0].get(COUNT_FIELD), Some(&FieldValue::Int(1)));
    assert_eq!(out.skipped.non_numeric_target, 1);
}

#[test]
fn count_where_rejects_unknown_operator() {
    let records = records_from(json!([{"g": "A", "v": 1}]));
    let err = ReductionEngine::default()
        .count_where(&records, &by(&["g"]), "v", 1.0, "=>")
        .unwrap_err();
    assert_eq!(err, ReduceError::InvalidOperator("=>".into()));
}

// ---------------------------------------------------------------------------
// sum_time_where
// ---------------------------------------------------------------------------

#[test]
fn sum_time_where_over_ten_minutes() {
    let values = vec![10.0; 11];
    let records = RecordFactory::new().create_series("2024-01-15T14:00:00Z", 60, &values);

    let out = ReductionEngine::default()
        .sum_time_where(&records, &by(&["machine"]), "value", "timestamp", 5.0, ">")
        .unwrap();

    assert_eq!(out.rows[0].get(DURATION_FIELD), Some(&FieldValue::Float(600.0)));
}

#[test]
fn sum_time_where_single_record_is_zero() {
    let records = RecordFactory::new().create_series("2024-01-15T14:00:00Z", 60, &[10.0]);

    let out = ReductionEngine::default()
        .sum_time_where(&records, &by(&["machine"]), "value", "timestamp", 5.0, ">")
        .unwrap();

    assert_eq!(num(&out.rows[0], DURATION_FIELD), 0.0);
}

#[test]
fn sum_time_where_needs_both_endpoints_and_sorts_by_time() {
    let mut records =
        RecordFactory::new().create_series("2024-01-15T14:00:00Z", 60, &[5.0, 5.0, 0.0, 5.0, 5.0]);
    records.reverse();

    let out = ReductionEngine::default()
        .sum_time_where(&records, &by(&["machine"]), "value", "timestamp", 1.0, ">=")
        .unwrap();

    assert_eq!(num(&out.rows[0], DURATION_FIELD), 120.0);
}

#[test]
fn sum_time_where_non_numeric_target_breaks_the_run() {
    let records = records_from(json!([
        {"g": "A", "ts": "2024-01-15T14:00:00Z", "v": 3},
        {"g": "A", "ts": "2024-01-15T14:01:00Z", "v": "err"},
        {"g": "A", "ts": "2024-01-15T14:02:00Z", "v": 3},
        {"g": "A", "ts": "2024-01-15T14:03:00Z"},
        {"g": "A", "ts": "2024-01-15T14:04:00Z", "v": 3},
    ]));

    let out = ReductionEngine::default()
        .sum_time_where(&records, &by(&["g"]), "v", "ts", 3.0, "==")
        .unwrap();

    // Only 14:02 -> 14:04 counts; the record without a target is left out
    assert_eq!(num(&out.rows[0], DURATION_FIELD), 120.0);
    assert_eq!(out.skipped.non_numeric_target, 1);
    assert_eq!(out.skipped.missing_target, 1);
}

#[test]
fn sum_time_where_skips_timestamps_beyond_the_calendar() {
    let records = records_from(json!([
        {"g": "A", "ts": -9.0e15, "v": 5},
        {"g": "A", "ts": 9.0e15, "v": 5},
        {"g": "A", "ts": "2024-01-15T14:00:00Z", "v": 5},
        {"g": "A", "ts": "2024-01-15T14:00:30Z", "v": 5},
    ]));

    let out = ReductionEngine::default()
        .sum_time_where(&records, &by(&["g"]), "v", "ts", 1.0, ">")
        .unwrap();

    assert_eq!(num(&out.rows[0], DURATION_FIELD), 30.0);
    assert_eq!(out.skipped.invalid_timestamp, 2);
}

#[test]
fn down_sample_fail_fast_rejects_out_of_range_timestamp() {
    let records = records_from(json!([{"g": "A", "ts": -9.2e15, "v": 1}]));
    let err = fail_fast()
        .down_sample(&records, &by(&["g"]), "v", "ts", "1T")
        .unwrap_err();
    assert!(matches!(err, ReduceError::InvalidTimestamp { ref field, .. } if field == "ts"));
}

// ---------------------------------------------------------------------------
// sum_list_yaxis
// ---------------------------------------------------------------------------

#[test]
fn sum_list_yaxis_adds_vectors_elementwise() {
    let records = records_from(json!([
        {"g": "A", "y": "[1, 4, 532.2, 23.2, 3]"},
        {"g": "A", "y": [1, 4, 532.2, 23.2, 3]},
    ]));

    let out = ReductionEngine::default()
        .sum_list_yaxis(&records, &by(&["g"]), "y")
        .unwrap();

    assert_eq!(
        out.rows[0].get("y"),
        Some(&FieldValue::List(vec![2.0, 8.0, 1064.4, 46.4, 6.0]))
    );
}

#[test]
fn sum_list_yaxis_length_mismatch_is_fatal() {
    let records = records_from(json!([
        {"g": "A", "y": "[1, 2]"},
        {"g": "A", "y": "[1, 2, 3]"},
    ]));

    let err = ReductionEngine::default()
        .sum_list_yaxis(&records, &by(&["g"]), "y")
        .unwrap_err();

    assert_eq!(
        err,
        ReduceError::VectorLengthMismatch {
            group: "A".into(),
            expected: 2,
            found: 3,
        }
    );
    assert!(err.is_structural());
}

#[test]
fn sum_list_yaxis_skips_malformed_and_omits_empty_groups() {
    let records = records_from(json!([
        {"g": "A", "y": "[1, 2]"},
        {"g": "A", "y": "[1, x]"},
        {"g": "B", "y": "oops"},
        {"g": "B"},
    ]));

    let out = ReductionEngine::default()
        .sum_list_yaxis(&records, &by(&["g"]), "y")
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out.rows[0].get("y"), Some(&FieldValue::List(vec![1.0, 2.0])));
    assert_eq!(out.skipped.malformed_vector, 2);
    assert_eq!(out.skipped.missing_target, 1);
}

#[test]
fn sum_list_yaxis_overflow_yields_null() {
    let records = records_from(json!([
        {"g": "A", "y": "[1e308, 1]"},
        {"g": "A", "y": "[1e308, 1]"},
        {"g": "B", "y": "[1, 1]"},
    ]));

    let out = ReductionEngine::default()
        .sum_list_yaxis(&records, &by(&["g"]), "y")
        .unwrap();

    assert_eq!(out.rows[0].get("y"), Some(&FieldValue::Null));
    assert_eq!(out.rows[1].get("y"), Some(&FieldValue::List(vec![2.0, 2.0])));
    assert_eq!(out.rows[0].to_json(), json!({"g": "A", "y": null}));
}

#[test]
fn sum_list_yaxis_fail_fast_on_malformed_vector() {
    let records = records_from(json!([{"g": "A", "y": "[1, x]"}]));
    let err = fail_fast()
        .sum_list_yaxis(&records, &by(&["g"]), "y")
        .unwrap_err();
    assert!(matches!(err, ReduceError::VectorParse(_)));
}

// ---------------------------------------------------------------------------
// sum
// ---------------------------------------------------------------------------

#[test]
fn sum_is_independent_of_record_order() {
    let mut records = records_from(json!([
        {"g": "A", "v": 1.5},
        {"g": "B", "v": 10},
        {"g": "A", "v": 2.5},
        {"g": "A", "v": 3},
    ]));
    let engine = ReductionEngine::default();

    let forward = engine.sum(&records, &by(&["g"]), "v").unwrap();
    records.reverse();
    let backward = engine.sum(&records, &by(&["g"]), "v").unwrap();

    let totals = |out: &crate::engine::core::reduce::ReductionOutput| {
        let mut t: Vec<(String, f64)> = out
            .rows
            .iter()
            .map(|r| (r.get("g").unwrap().to_string_repr(), num(r, "v")))
            .collect();
        t.sort_by(|a, b| a.0.cmp(&b.0));
        t
    };
    assert_eq!(totals(&forward), vec![("A".to_string(), 7.0), ("B".to_string(), 10.0)]);
    assert_eq!(totals(&forward), totals(&backward));
}

#[test]
fn sum_of_group_without_numbers_is_zero() {
    let records = records_from(json!([{"g": "A", "v": "x"}, {"g": "A"}]));
    let out = ReductionEngine::default()
        .sum(&records, &by(&["g"]), "v")
        .unwrap();
    assert_eq!(num(&out.rows[0], "v"), 0.0);
    assert_eq!(out.skipped_total(), 2);
}

#[test]
fn sum_fail_fast_reports_first_bad_value() {
    let records = records_from(json!([{"g": "A", "v": 1}, {"g": "A", "v": "x"}]));
    let err = fail_fast().sum(&records, &by(&["g"]), "v").unwrap_err();
    assert_eq!(
        err,
        ReduceError::NonNumericValue {
            field: "v".into(),
            value: "x".into(),
        }
    );
}

#[test]
fn multi_field_grouping() {
    let records = records_from(json!([
        {"machine": "m1", "line": 1, "v": 1},
        {"machine": "m1", "line": 2, "v": 2},
        {"machine": "m1", "line": 1.0, "v": 3},
    ]));
    let out = ReductionEngine::default()
        .sum(&records, &by(&["machine", "line"]), "v")
        .unwrap();

    let rows: Vec<_> = out.rows.iter().map(Record::to_json).collect();
    assert_eq!(
        rows,
        vec![
            json!({"machine": "m1", "line": 1, "v": 4.0}),
            json!({"machine": "m1", "line": 2, "v": 2.0}),
        ]
    );
}

#[test]
fn grouping_keeps_value_kinds_apart() {
    let records = records_from(json!([
        {"g": true, "v": 1},
        {"g": "true", "v": 2},
        {"g": 5.5, "v": 3},
        {"g": "5.5", "v": 4},
        {"g": [1, 2], "v": 5},
        {"g": "[1, 2]", "v": 6},
    ]));

    let out = ReductionEngine::default()
        .sum(&records, &by(&["g"]), "v")
        .unwrap();

    assert_eq!(out.len(), 6);
    assert_eq!(out.rows[0].get("g"), Some(&FieldValue::Bool(true)));
    assert_eq!(num(&out.rows[0], "v"), 1.0);
    assert_eq!(out.rows[1].get("g"), Some(&FieldValue::Str("true".into())));
    assert_eq!(num(&out.rows[1], "v"), 2.0);
}

#[test]
fn misspelled_grouping_field_is_an_error() {
    let records = records_from(json!([{"g": "A", "v": 1}, {"g": "B", "v": 2}]));
    let err = ReductionEngine::default()
        .sum(&records, &by(&["gg"]), "v")
        .unwrap_err();
    assert!(matches!(err, ReduceError::InvalidGrouping(_)));
}

// ---------------------------------------------------------------------------
// get_max_row
// ---------------------------------------------------------------------------

#[test]
fn get_max_row_returns_full_record_and_prefers_first_tie() {
    let records = records_from(json!([
        {"g": "A", "v": 3, "id": 1},
        {"g": "A", "v": 9, "id": 2},
        {"g": "B", "v": 4, "id": 3},
        {"g": "A", "v": 9, "id": 4},
    ]));

    let out = ReductionEngine::default()
        .get_max_row(&records, &by(&["g"]), "v")
        .unwrap();

    assert_eq!(out.rows, vec![records[1].clone(), records[2].clone()]);
}

#[test]
fn get_max_row_is_idempotent() {
    let records = records_from(json!([
        {"g": "A", "v": 3},
        {"g": "A", "v": 8},
        {"g": "B", "v": 1},
    ]));
    let engine = ReductionEngine::default();

    let once = engine.get_max_row(&records, &by(&["g"]), "v").unwrap();
    let twice = engine.get_max_row(&once.rows, &by(&["g"]), "v").unwrap();
    assert_eq!(once.rows, twice.rows);
}

#[test]
fn get_max_row_omits_groups_without_numbers() {
    let records = records_from(json!([{"g": "A", "v": "x"}, {"g": "B", "v": 2}]));
    let out = ReductionEngine::default()
        .get_max_row(&records, &by(&["g"]), "v")
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.rows[0].get("g"), Some(&FieldValue::Str("B".into())));
}

// ---------------------------------------------------------------------------
// shared behaviour
// ---------------------------------------------------------------------------

fn every_op() -> Vec<ReductionOp> {
    vec![
        ReductionOp::DownSample {
            target_key: "v".into(),
            timestamp_key: "ts".into(),
            frequency: Some("1T".into()),
        },
        ReductionOp::StatsDescription {
            target_key: "v".into(),
        },
        ReductionOp::CountWhere {
            target_key: "v".into(),
            compare_value: 1.0,
            condition_type: ">".into(),
        },
        ReductionOp::SumTimeWhere {
            target_key: "v".into(),
            timestamp_key: "ts".into(),
            compare_value: 1.0,
            condition_type: ">".into(),
        },
        ReductionOp::SumListYaxis {
            target_key: "v".into(),
        },
        ReductionOp::Sum {
            target_key: "v".into(),
        },
        ReductionOp::GetMaxRow {
            target_key: "v".into(),
        },
    ]
}

#[test]
fn empty_grouping_is_rejected_by_every_operation() {
    let records = records_from(json!([{"g": "A", "v": 1, "ts": "2024-01-15T14:00:00Z"}]));
    let engine = ReductionEngine::default();

    for op in every_op() {
        let name = op.name();
        let err = engine
            .apply(&records, &ReductionRequest::new(Vec::new(), op))
            .unwrap_err();
        assert!(
            matches!(err, ReduceError::InvalidGrouping(_)),
            "{name} returned {err:?}"
        );
    }
}

#[test]
fn empty_input_yields_empty_output() {
    let engine = ReductionEngine::default();
    for op in every_op() {
        let out = engine
            .apply(&[], &ReductionRequest::new(by(&["g"]), op))
            .unwrap();
        assert!(out.is_empty());
        assert!(out.skipped.is_empty());
    }
}

#[test]
fn input_records_are_left_untouched() {
    let records = records_from(json!([
        {"g": "A", "v": 1, "ts": "2024-01-15T14:00:00Z"},
        {"g": "A", "v": 2, "ts": "2024-01-15T14:00:30Z"},
    ]));
    let snapshot = records.clone();
    let engine = ReductionEngine::default();

    for op in every_op() {
        let _ = engine.apply(&records, &ReductionRequest::new(by(&["g"]), op));
    }
    assert_eq!(records, snapshot);
}
