use serde::Serialize;

use crate::model::CandidateId;
use crate::normalize::{NormalizedScores, ScoreTable};
use crate::Normalized;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RadarAxis {
    pub metric: String,
    pub value: Normalized,
    /// Set when the candidate has no score for the metric and `value` is the midpoint filler.
    pub imputed: bool,
}

/// Per-candidate polygon. There is always one axis per metric of the set, because a polygon
/// needs a vertex on every axis; unlike rankings, gaps are filled with the midpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RadarVector {
    pub candidate_id: CandidateId,
    pub name: String,
    pub axes: Vec<RadarAxis>,
}

impl RadarVector {
    pub fn values(&self) -> Vec<f64> {
        self.axes.iter().map(|axis| axis.value.as_f64()).collect()
    }
}

pub fn radar(
    table: &ScoreTable<'_>,
    normalized: &NormalizedScores,
    candidate: usize,
) -> RadarVector {
    let axes = table
        .metrics()
        .iter()
        .zip(normalized.row(candidate))
        .map(|(metric, value)| RadarAxis {
            metric: metric.to_string(),
            value: value.unwrap_or(Normalized::MIDPOINT),
            imputed: value.is_none(),
        })
        .collect();
    let candidate = &table.candidates()[candidate];
    RadarVector {
        candidate_id: candidate.id.clone(),
        name: candidate.name.clone(),
        axes,
    }
}
