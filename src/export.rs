use std::io;

use serde::Serialize;

use crate::model::CandidateId;
use crate::normalize::ScoreTable;
use crate::rank::RankingResult;
use crate::{EngineError, RawScore};

/// Candidate attribute columns that precede the metric columns.
pub const ATTRIBUTE_COLUMNS: [&str; 5] = [
    "candidate_id",
    "name",
    "email",
    "position",
    "experience_years",
];
/// Computed columns, always last.
pub const COMPUTED_COLUMNS: [&str; 2] = ["score", "rank"];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportRow {
    pub candidate_id: CandidateId,
    pub name: String,
    pub email: Option<String>,
    pub position: Option<String>,
    pub experience_years: Option<u32>,
    pub values: Vec<Option<RawScore>>,
    pub score: Option<f64>,
    pub rank: usize,
}

impl ExportRow {
    fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.candidate_id.to_string(),
            self.name.clone(),
            self.email.clone().unwrap_or_default(),
            self.position.clone().unwrap_or_default(),
            self.experience_years
                .map(|years| years.to_string())
                .unwrap_or_default(),
        ];
        cells.extend(
            self.values
                .iter()
                .map(|value| value.map(|v| v.as_f64().to_string()).unwrap_or_default()),
        );
        cells.push(self.score.map(|s| s.to_string()).unwrap_or_default());
        cells.push(self.rank.to_string());
        cells
    }
}

/// Flat table with one row per candidate. Columns are the candidate attributes, then the metrics
/// in metric set order, then the computed columns, so repeated exports of unchanged data are
/// byte-identical.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    /// Write the table as CSV with a header row. Absent values are empty cells.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), EngineError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.cells())?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, EngineError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Rows follow the order of `ranking`.
pub fn export_table(table: &ScoreTable<'_>, ranking: &RankingResult) -> ExportTable {
    let columns = ATTRIBUTE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(table.metrics().iter().map(str::to_string))
        .chain(COMPUTED_COLUMNS.iter().map(|c| c.to_string()))
        .collect();

    let rows = ranking
        .entries
        .iter()
        .filter_map(|entry| {
            let index = table.candidate_index(&entry.candidate_id)?;
            let candidate = &table.candidates()[index];
            Some(ExportRow {
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                email: candidate.email.clone(),
                position: candidate.position.clone(),
                experience_years: candidate.experience_years,
                values: table.row(index).to_vec(),
                score: entry.score,
                rank: entry.rank,
            })
        })
        .collect();

    ExportTable { columns, rows }
}
