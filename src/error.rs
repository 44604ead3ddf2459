use crate::model::{CandidateId, SessionId};
use crate::store::StoreError;

/// Failure of a single engine query. Nothing here is retried; every variant is returned to the
/// immediate caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no such session: {0}")]
    SessionNotFound(SessionId),
    #[error("score {value} for candidate {candidate} on metric {metric:?} is outside [0, 10]")]
    ScoreOutOfRange {
        candidate: CandidateId,
        metric: String,
        value: f64,
    },
    #[error("invalid weights: {0}")]
    InvalidWeights(String),
    #[error("metric {0:?} is not part of the metric set")]
    MetricNotFound(String),
    #[error("unknown ranking mode {0:?}")]
    InvalidMode(String),
    #[error("candidate {0} is not part of the session")]
    CandidateNotFound(CandidateId),
    #[error("bucket width {0} must be finite, at most 10 and yield no more than 1000 buckets")]
    InvalidBucketWidth(f64),
    #[error("metric {0:?} appears more than once in the metric set")]
    DuplicateMetric(String),
    #[error("score store failure: {0}")]
    Store(StoreError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::SessionNotFound(session) => Self::SessionNotFound(session),
            other => Self::Store(other),
        }
    }
}
