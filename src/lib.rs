//! Scoring and ranking engine for interview sessions.
//!
//! Raw per-candidate, per-metric scores on a 0 to 10 scale are read from a [`ScoreStore`],
//! normalized within their session, and turned into rankings and dashboard aggregates. Every
//! query recomputes from a single fetch and the engine keeps no state between queries, so
//! identical records always yield identical results.

pub mod aggregate;
mod engine;
mod error;
pub mod export;
pub mod model;
pub mod normalize;
pub mod num;
pub mod rank;
pub mod store;
#[cfg(test)]
mod test;

pub use crate::aggregate::{
    AggregateSnapshot, Bucket, Distribution, Heatmap, HeatmapRow, MetricSummary, RadarAxis,
    RadarVector, SessionSummary, DEFAULT_BUCKET_WIDTH,
};
pub use crate::engine::{HeatmapOrder, RankingEngine};
pub use crate::error::EngineError;
pub use crate::export::{ExportRow, ExportTable};
pub use crate::model::{Candidate, CandidateId, MetricSet, ScoreRecord, Session, SessionId};
pub use crate::normalize::NormalizedScore;
pub use crate::num::{Normalized, RawScore, Weight};
pub use crate::rank::{RankedEntry, RankingMode, RankingResult};
pub use crate::store::{InMemoryStore, ScoreStore, StoreError};
