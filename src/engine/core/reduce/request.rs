use serde::{Deserialize, Serialize};

/// One of the seven fixed reductions, with its operation-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum ReductionOp {
    /// Mean of `target_key` per time bucket
    DownSample {
        target_key: String,
        timestamp_key: String,
        /// Falls back to the engine's default frequency
        #[serde(default)]
        frequency: Option<String>,
    },
    StatsDescription {
        target_key: String,
    },
    CountWhere {
        target_key: String,
        compare_value: f64,
        condition_type: String,
    },
    SumTimeWhere {
        target_key: String,
        timestamp_key: String,
        compare_value: f64,
        condition_type: String,
    },
    SumListYaxis {
        target_key: String,
    },
    Sum {
        target_key: String,
    },
    GetMaxRow {
        target_key: String,
    },
}

impl ReductionOp {
    pub fn name(&self) -> &'static str {
        match self {
            ReductionOp::DownSample { .. } => "down_sample",
            ReductionOp::StatsDescription { .. } => "stats_description",
            ReductionOp::CountWhere { .. } => "count_where",
            ReductionOp::SumTimeWhere { .. } => "sum_time_where",
            ReductionOp::SumListYaxis { .. } => "sum_list_yaxis",
            ReductionOp::Sum { .. } => "sum",
            ReductionOp::GetMaxRow { .. } => "get_max_row",
        }
    }

    pub fn target_key(&self) -> &str {
        match self {
            ReductionOp::DownSample { target_key, .. }
            | ReductionOp::StatsDescription { target_key }
            | ReductionOp::CountWhere { target_key, .. }
            | ReductionOp::SumTimeWhere { target_key, .. }
            | ReductionOp::SumListYaxis { target_key }
            | ReductionOp::Sum { target_key }
            | ReductionOp::GetMaxRow { target_key } => target_key,
        }
    }
}

/// Grouping fields plus the reduction to run over each group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionRequest {
    pub group_by: Vec<String>,
    #[serde(flatten)]
    pub op: ReductionOp,
}

impl ReductionRequest {
    pub fn new(group_by: Vec<String>, op: ReductionOp) -> Self {
        Self { group_by, op }
    }
}
