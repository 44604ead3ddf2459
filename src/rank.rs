use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{CandidateId, MetricSet};
use crate::normalize::{NormalizedScores, ScoreTable};
use crate::{EngineError, Normalized, Weight};

/// How candidates are ordered. Parameters travel with the mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RankingMode {
    /// Raw value of one metric, descending.
    SingleMetric { metric: String },
    /// Weighted mean of normalized values. Weights need not sum to 1.
    WeightedAverage { weights: BTreeMap<String, f64> },
    /// Weighted average with a weight of 1 for every metric of the set.
    Composite,
}

impl RankingMode {
    pub const SINGLE_METRIC: &'static str = "single_metric";
    pub const WEIGHTED_AVERAGE: &'static str = "weighted_average";
    pub const COMPOSITE: &'static str = "composite";

    /// Build a mode from its name and loosely typed parameters, as received from a form or a
    /// command line.
    pub fn parse(
        kind: &str,
        metric: Option<String>,
        weights: BTreeMap<String, f64>,
    ) -> Result<Self, EngineError> {
        match kind.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            Self::SINGLE_METRIC => {
                let metric = metric
                    .ok_or_else(|| EngineError::MetricNotFound("<no metric given>".to_string()))?;
                Ok(Self::SingleMetric { metric })
            }
            Self::WEIGHTED_AVERAGE => Ok(Self::WeightedAverage { weights }),
            Self::COMPOSITE => Ok(Self::Composite),
            _ => Err(EngineError::InvalidMode(kind.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleMetric { .. } => Self::SINGLE_METRIC,
            Self::WeightedAverage { .. } => Self::WEIGHTED_AVERAGE,
            Self::Composite => Self::COMPOSITE,
        }
    }

    /// Resolve metric names against the metric set and validate weights. Runs before any score
    /// is fetched.
    pub fn plan(&self, metrics: &MetricSet) -> Result<RankingPlan, EngineError> {
        match self {
            Self::SingleMetric { metric } => Ok(RankingPlan::SingleMetric {
                metric: metrics.require(metric)?,
            }),
            Self::WeightedAverage { weights } => {
                let mut aligned = vec![Weight::new(0.0); metrics.len()];
                for (metric, &value) in weights {
                    let column = metrics.require(metric)?;
                    aligned[column] = Weight::new(value);
                    if aligned[column].is_none() {
                        return Err(EngineError::InvalidWeights(format!(
                            "weight {value} for {metric:?} must be finite and non-negative"
                        )));
                    }
                }
                let aligned: Vec<Weight> = aligned.into_iter().flatten().collect();
                let largest = aligned.iter().map(Weight::as_f64).fold(0.0, f64::max);
                if largest == 0.0 {
                    return Err(EngineError::InvalidWeights(
                        "at least one weight must be positive".to_string(),
                    ));
                }
                // Rescale to at most 1 so the weighted sums cannot overflow.
                let weights = aligned
                    .iter()
                    .filter_map(|weight| Weight::new(weight.as_f64() / largest))
                    .collect();
                Ok(RankingPlan::Weighted { weights })
            }
            Self::Composite => {
                let weights = metrics
                    .iter()
                    .map(|metric| (metric.to_string(), 1.0))
                    .collect();
                Self::WeightedAverage { weights }.plan(metrics)
            }
        }
    }
}

/// A mode whose metric references have been resolved to metric set columns.
#[derive(Clone, Debug)]
pub enum RankingPlan {
    SingleMetric { metric: usize },
    Weighted { weights: Vec<Weight> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position in the ordering.
    pub rank: usize,
    pub candidate_id: CandidateId,
    pub name: String,
    /// Value the ordering used: the raw value for single-metric rankings, the weighted average
    /// of normalized values otherwise. `None` when the candidate has nothing to rank on.
    pub score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankingResult {
    pub mode: RankingMode,
    pub entries: Vec<RankedEntry>,
}

impl RankingResult {
    /// Keep the first `n` entries.
    pub fn top(mut self, n: usize) -> Self {
        self.entries.truncate(n);
        self
    }

    pub fn position(&self, candidate: &CandidateId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.candidate_id == candidate)
    }
}

struct Keyed {
    index: usize,
    score: Option<f64>,
    tie_break: f64,
}

/// Order every candidate of the table best-first.
pub fn rank(
    table: &ScoreTable<'_>,
    normalized: &NormalizedScores,
    mode: &RankingMode,
    plan: &RankingPlan,
) -> RankingResult {
    let mut keys: Vec<Keyed> = (0..table.candidates().len())
        .map(|index| match plan {
            RankingPlan::SingleMetric { metric } => single_metric_key(table, index, *metric),
            RankingPlan::Weighted { weights } => weighted_key(normalized, index, weights),
        })
        .collect();
    keys.sort_by(compare);

    let entries = keys
        .into_iter()
        .enumerate()
        .map(|(position, key)| {
            let candidate = &table.candidates()[key.index];
            RankedEntry {
                rank: position + 1,
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                score: key.score,
            }
        })
        .collect();
    RankingResult {
        mode: mode.clone(),
        entries,
    }
}

fn single_metric_key(table: &ScoreTable<'_>, index: usize, metric: usize) -> Keyed {
    let others: f64 = table
        .row(index)
        .iter()
        .enumerate()
        .filter(|(column, _)| *column != metric)
        .filter_map(|(_, value)| value.map(|v| v.as_f64()))
        .sum();
    Keyed {
        index,
        score: table.value(index, metric).map(|v| v.as_f64()),
        tie_break: others,
    }
}

fn weighted_key(normalized: &NormalizedScores, index: usize, weights: &[Weight]) -> Keyed {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut components = 0.0;
    for (value, weight) in normalized.row(index).iter().zip(weights) {
        let Some(value) = value else {
            continue;
        };
        numerator += weight.as_f64() * value.as_f64();
        denominator += weight.as_f64();
        if !weight.is_zero() {
            components += value.as_f64();
        }
    }
    let score = (denominator > 0.0)
        .then(|| Normalized::clamp(numerator / denominator, 0.0, 1.0))
        .flatten()
        .map(|score| score.as_f64());
    Keyed {
        index,
        score,
        tie_break: components,
    }
}

fn compare(a: &Keyed, b: &Keyed) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => y
            .total_cmp(&x)
            .then_with(|| b.tie_break.total_cmp(&a.tie_break))
            .then_with(|| a.index.cmp(&b.index)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.index.cmp(&b.index),
    }
}
