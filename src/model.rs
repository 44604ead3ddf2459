use std::fmt;

use serde::{Deserialize, Serialize};

use crate::EngineError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id!(
    /// Identifies one hiring round. All statistics are scoped to a single session.
    SessionId
);
string_id!(CandidateId);

/// A hiring round and its display attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    #[serde(default)]
    pub interviewer: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// A candidate owned by exactly one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub session_id: SessionId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, session_id: SessionId, name: impl Into<String>) -> Self {
        Self {
            id: CandidateId::new(id),
            session_id,
            name: name.into(),
            email: None,
            position: None,
            experience_years: None,
        }
    }
}

/// One raw score as handed over by the store. The value is not trusted until the normalizer has
/// range-checked it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub candidate_id: CandidateId,
    pub metric: String,
    pub raw_value: f64,
}

impl ScoreRecord {
    pub fn new(candidate_id: impl Into<String>, metric: impl Into<String>, raw_value: f64) -> Self {
        Self {
            candidate_id: CandidateId::new(candidate_id),
            metric: metric.into(),
            raw_value,
        }
    }
}

/// Ordered list of evaluation metrics. The order fixes radar axes, heatmap columns and export
/// columns, so it must be the same for every candidate of a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MetricSet(Vec<String>);

impl MetricSet {
    pub fn new<I, S>(names: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut metrics: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if metrics.contains(&name) {
                return Err(EngineError::DuplicateMetric(name));
            }
            metrics.push(name);
        }
        Ok(Self(metrics))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn position(&self, metric: &str) -> Option<usize> {
        self.0.iter().position(|m| m == metric)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.position(metric).is_some()
    }

    /// Index of `metric`, or `MetricNotFound`.
    pub fn require(&self, metric: &str) -> Result<usize, EngineError> {
        self.position(metric)
            .ok_or_else(|| EngineError::MetricNotFound(metric.to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}
