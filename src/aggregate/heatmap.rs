use serde::Serialize;

use crate::model::CandidateId;
use crate::normalize::ScoreTable;
use crate::rank::RankingResult;
use crate::RawScore;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapRow {
    pub candidate_id: CandidateId,
    pub name: String,
    /// Raw values in metric set order. `None` is a cell without data, never a zero.
    pub cells: Vec<Option<RawScore>>,
}

/// Candidate by metric grid of raw values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heatmap {
    pub metrics: Vec<String>,
    pub rows: Vec<HeatmapRow>,
}

/// Rows follow candidate insertion order, or the order of `ranking` when one is given.
pub fn heatmap(table: &ScoreTable<'_>, ranking: Option<&RankingResult>) -> Heatmap {
    let rows: Vec<HeatmapRow> = table
        .candidates()
        .iter()
        .enumerate()
        .map(|(index, candidate)| HeatmapRow {
            candidate_id: candidate.id.clone(),
            name: candidate.name.clone(),
            cells: table.row(index).to_vec(),
        })
        .collect();

    let rows: Vec<HeatmapRow> = match ranking {
        Some(ranking) => {
            let order = permutation::sort_by_key(&rows[..], |row: &HeatmapRow| {
                ranking.position(&row.candidate_id).unwrap_or(usize::MAX)
            });
            order.apply_slice(&rows[..])
        }
        None => rows,
    };

    Heatmap {
        metrics: table.metrics().names().to_vec(),
        rows,
    }
}
