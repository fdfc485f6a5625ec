use crate::engine::types::Record;

/// Arithmetic mean over a bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, v: f64) {
        self.sum += v;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finalize(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

/// Summary statistics of a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Collects values for count/mean/std/min/quartiles/max
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Describe {
    values: Vec<f64>,
}

impl Describe {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, v: f64) {
        self.values.push(v);
    }

    pub fn finalize(&self) -> DescribeStats {
        let count = self.values.len();
        if count == 0 {
            return DescribeStats {
                count,
                mean: None,
                std: None,
                min: None,
                q25: None,
                q50: None,
                q75: None,
                max: None,
            };
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        // Sample standard deviation (ddof = 1)
        let std = if count > 1 {
            let ss: f64 = sorted.iter().map(|v| (v - mean) * (v - mean)).sum();
            Some((ss / (n - 1.0)).sqrt())
        } else {
            None
        };

        DescribeStats {
            count,
            mean: Some(mean),
            std,
            min: sorted.first().copied(),
            q25: Some(quantile(&sorted, 0.25)),
            q50: Some(quantile(&sorted, 0.50)),
            q75: Some(quantile(&sorted, 0.75)),
            max: sorted.last().copied(),
        }
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountWhere {
    count: i64,
}

impl CountWhere {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, holds: bool) {
        if holds {
            self.count += 1;
        }
    }

    pub fn finalize(&self) -> i64 {
        self.count
    }
}

/// Time spent with a condition holding, over timestamp-sorted samples.
///
/// The interval between two consecutive samples counts only when the
/// condition holds at both of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationWhere {
    prev: Option<(i64, bool)>,
    total_millis: i64,
}

impl DurationWhere {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples must arrive in non-decreasing timestamp order.
    pub fn update(&mut self, ts_millis: i64, holds: bool) {
        if let Some((prev_ts, prev_holds)) = self.prev {
            if prev_holds && holds {
                let interval = ts_millis.saturating_sub(prev_ts);
                self.total_millis = self.total_millis.saturating_add(interval);
            }
        }
        self.prev = Some((ts_millis, holds));
    }

    pub fn total_millis(&self) -> i64 {
        self.total_millis
    }

    pub fn finalize_seconds(&self) -> f64 {
        self.total_millis as f64 / 1_000.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sum {
    sum: f64,
}

impl Sum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn update(&mut self, v: f64) {
        self.sum += v;
    }

    pub fn finalize(&self) -> f64 {
        self.sum
    }
}

/// Elementwise sum of equal-length vectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSum {
    acc: Option<Vec<f64>>,
}

impl VectorSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(expected, found)` lengths when `v` does not match earlier vectors.
    pub fn update(&mut self, v: Vec<f64>) -> Result<(), (usize, usize)> {
        match &mut self.acc {
            Some(acc) => crate::engine::core::vector::add_assign(acc, &v),
            None => {
                self.acc = Some(v);
                Ok(())
            }
        }
    }

    pub fn finalize(self) -> Option<Vec<f64>> {
        self.acc
    }
}

/// Row holding the largest value; the first occurrence wins ties.
#[derive(Debug, Clone, Default)]
pub struct MaxRow<'a> {
    best: Option<(f64, &'a Record)>,
}

impl<'a> MaxRow<'a> {
    pub fn new() -> Self {
        Self { best: None }
    }

    #[inline]
    pub fn update(&mut self, v: f64, record: &'a Record) {
        match self.best {
            Some((cur, _)) if v <= cur => {}
            _ => self.best = Some((v, record)),
        }
    }

    pub fn finalize(&self) -> Option<&'a Record> {
        self.best.map(|(_, record)| record)
    }
}
