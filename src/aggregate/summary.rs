use serde::Serialize;

use crate::normalize::{NormalizedScores, ScoreTable};
use crate::RawScore;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    pub scored: usize,
    pub mean: Option<f64>,
    pub min: Option<RawScore>,
    pub max: Option<RawScore>,
}

/// Headline figures for a session dashboard.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_candidates: usize,
    /// Candidates with at least one recorded metric.
    pub evaluated_candidates: usize,
    /// Mean of the per-metric means, over metrics that have any data.
    pub average_score: Option<f64>,
    pub highest_score: Option<RawScore>,
    pub metrics: Vec<MetricSummary>,
}

pub fn summarize(table: &ScoreTable<'_>, normalized: &NormalizedScores) -> SessionSummary {
    let metrics: Vec<MetricSummary> = table
        .metrics()
        .iter()
        .enumerate()
        .map(|(column, metric)| {
            let values: Vec<f64> = table.column(column).flatten().map(|v| v.as_f64()).collect();
            let range = normalized.range(column);
            MetricSummary {
                metric: metric.to_string(),
                scored: values.len(),
                mean: mean(&values),
                min: range.map(|r| r.min),
                max: range.map(|r| r.max),
            }
        })
        .collect();

    let means: Vec<f64> = metrics.iter().filter_map(|m| m.mean).collect();
    SessionSummary {
        total_candidates: table.candidates().len(),
        evaluated_candidates: (0..table.candidates().len())
            .filter(|&candidate| table.is_evaluated(candidate))
            .count(),
        average_score: mean(&means),
        highest_score: metrics.iter().filter_map(|m| m.max).max(),
        metrics,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
