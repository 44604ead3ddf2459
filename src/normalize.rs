use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Candidate, CandidateId, MetricSet, ScoreRecord};
use crate::{EngineError, Normalized, RawScore};

/// Raw scores of one session laid out as candidate rows and metric columns. Rows follow the
/// candidate insertion order, columns follow the metric set. `None` marks a metric that was never
/// recorded for the candidate.
#[derive(Clone, Debug)]
pub struct ScoreTable<'m> {
    metrics: &'m MetricSet,
    candidates: Vec<Candidate>,
    raw: Vec<Vec<Option<RawScore>>>,
}

impl<'m> ScoreTable<'m> {
    /// Range-check every record, then keep the last value supplied for each (candidate, metric)
    /// pair. Fails on the first record outside [0, 10].
    pub fn build(
        metrics: &'m MetricSet,
        candidates: Vec<Candidate>,
        records: &[ScoreRecord],
    ) -> Result<Self, EngineError> {
        let validated = records
            .iter()
            .map(|record| {
                RawScore::new(record.raw_value)
                    .map(|score| (record, score))
                    .ok_or_else(|| EngineError::ScoreOutOfRange {
                        candidate: record.candidate_id.clone(),
                        metric: record.metric.clone(),
                        value: record.raw_value,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows: BTreeMap<&CandidateId, usize> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| (&candidate.id, index))
            .collect();
        let mut raw = vec![vec![None; metrics.len()]; candidates.len()];
        for (record, score) in validated {
            let Some(&row) = rows.get(&record.candidate_id) else {
                tracing::warn!(
                    candidate = %record.candidate_id,
                    metric = %record.metric,
                    "ignoring score for a candidate outside the session"
                );
                continue;
            };
            let Some(column) = metrics.position(&record.metric) else {
                tracing::debug!(metric = %record.metric, "ignoring metric outside the metric set");
                continue;
            };
            raw[row][column] = Some(score);
        }

        Ok(Self {
            metrics,
            candidates,
            raw,
        })
    }

    pub fn metrics(&self) -> &'m MetricSet {
        self.metrics
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn row(&self, candidate: usize) -> &[Option<RawScore>] {
        &self.raw[candidate]
    }

    pub fn value(&self, candidate: usize, metric: usize) -> Option<RawScore> {
        self.raw[candidate][metric]
    }

    /// Values of one metric, one entry per candidate.
    pub fn column(&self, metric: usize) -> impl Iterator<Item = Option<RawScore>> + '_ {
        self.raw.iter().map(move |row| row[metric])
    }

    pub fn candidate_index(&self, id: &CandidateId) -> Option<usize> {
        self.candidates.iter().position(|c| &c.id == id)
    }

    pub fn is_evaluated(&self, candidate: usize) -> bool {
        self.raw[candidate].iter().any(Option::is_some)
    }
}

/// Observed range of one metric within a session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MetricRange {
    pub min: RawScore,
    pub max: RawScore,
}

impl MetricRange {
    /// Rescale `raw` onto [0, 1]. A metric without spread maps every value to the midpoint.
    pub fn normalize(&self, raw: RawScore) -> Normalized {
        let span = self.max.as_f64() - self.min.as_f64();
        if span <= 0.0 {
            return Normalized::MIDPOINT;
        }
        Normalized::clamp((raw.as_f64() - self.min.as_f64()) / span, 0.0, 1.0)
            .unwrap_or(Normalized::MIDPOINT)
    }
}

/// A derived per-query value, never persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedScore {
    pub candidate_id: CandidateId,
    pub metric: String,
    pub value: Normalized,
}

/// Normalized values aligned with the rows and columns of the `ScoreTable` they came from.
#[derive(Clone, Debug)]
pub struct NormalizedScores {
    ranges: Vec<Option<MetricRange>>,
    values: Vec<Vec<Option<Normalized>>>,
}

impl NormalizedScores {
    pub fn range(&self, metric: usize) -> Option<MetricRange> {
        self.ranges[metric]
    }

    pub fn row(&self, candidate: usize) -> &[Option<Normalized>] {
        &self.values[candidate]
    }

    pub fn value(&self, candidate: usize, metric: usize) -> Option<Normalized> {
        self.values[candidate][metric]
    }

    /// Flattened view in row-major order, skipping absent pairs.
    pub fn records(&self, table: &ScoreTable<'_>) -> Vec<NormalizedScore> {
        let mut records = Vec::new();
        for (candidate, row) in table.candidates().iter().zip(&self.values) {
            for (metric, value) in table.metrics().iter().zip(row) {
                if let Some(value) = value {
                    records.push(NormalizedScore {
                        candidate_id: candidate.id.clone(),
                        metric: metric.to_string(),
                        value: *value,
                    });
                }
            }
        }
        records
    }
}

/// Min-max normalize every metric independently over the candidates of the session.
pub fn normalize(table: &ScoreTable<'_>) -> NormalizedScores {
    let ranges: Vec<Option<MetricRange>> = (0..table.metrics().len())
        .map(|metric| {
            let mut values = table.column(metric).flatten();
            let first = values.next()?;
            let (min, max) = values.fold((first, first), |(min, max), value| {
                (min.min(value), max.max(value))
            });
            Some(MetricRange { min, max })
        })
        .collect();

    let values = (0..table.candidates().len())
        .map(|candidate| {
            table
                .row(candidate)
                .iter()
                .zip(&ranges)
                .map(|(raw, range)| Some(range.as_ref()?.normalize((*raw)?)))
                .collect()
        })
        .collect();

    NormalizedScores { ranges, values }
}
