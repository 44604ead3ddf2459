use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use interview_ranking::{
    Candidate, EngineError, InMemoryStore, MetricSet, ScoreRecord, Session, SessionId, StoreError,
};
use rand::{rngs::SmallRng, Rng as _, SeedableRng as _};
use serde::Deserialize;

pub const SESSION_ID: &str = "cli";

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("unable to read {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },
    #[error("line {line}: {source}")]
    Row { line: u64, source: csv::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    candidate_id: String,
    #[serde(default)]
    name: Option<String>,
    metric: String,
    value: f64,
}

/// One session worth of scores held in memory.
#[derive(Debug)]
pub struct Loaded {
    pub store: InMemoryStore,
    pub session: SessionId,
    /// Metric names in order of first appearance.
    pub seen_metrics: Vec<String>,
    candidates: BTreeSet<String>,
}

impl Loaded {
    fn empty(name: &str) -> Result<Self, InputError> {
        let session = SessionId::new(SESSION_ID);
        let mut store = InMemoryStore::new();
        store.create_session(Session {
            id: session.clone(),
            name: name.to_string(),
            interviewer: None,
            date: None,
        })?;
        Ok(Self {
            store,
            session,
            seen_metrics: Vec::new(),
            candidates: BTreeSet::new(),
        })
    }

    fn push(
        &mut self,
        candidate: &str,
        name: Option<&str>,
        metric: &str,
        value: f64,
    ) -> Result<(), InputError> {
        if self.candidates.insert(candidate.to_string()) {
            let name = name.filter(|n| !n.is_empty()).unwrap_or(candidate);
            self.store
                .add_candidate(Candidate::new(candidate, self.session.clone(), name))?;
        }
        if !self.seen_metrics.iter().any(|m| m == metric) {
            self.seen_metrics.push(metric.to_string());
        }
        self.store
            .record_score(&self.session, ScoreRecord::new(candidate, metric, value))?;
        Ok(())
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn metric_set(&self) -> Result<MetricSet, EngineError> {
        MetricSet::new(self.seen_metrics.iter().cloned())
    }
}

/// Read `candidate_id,name,metric,value` rows. Candidates keep the order of their first row and
/// later rows for the same pair overwrite earlier ones.
pub fn load_csv(path: &Path) -> Result<Loaded, InputError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| SESSION_ID.to_string());
    read_rows(reader, &name)
}

pub fn read_csv<R: io::Read>(reader: R, name: &str) -> Result<Loaded, InputError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    read_rows(reader, name)
}

fn read_rows<R: io::Read>(mut reader: csv::Reader<R>, name: &str) -> Result<Loaded, InputError> {
    let mut loaded = Loaded::empty(name)?;
    for (index, row) in reader.deserialize::<ScoreRow>().enumerate() {
        let row = row.map_err(|source| InputError::Row {
            line: index as u64 + 2,
            source,
        })?;
        loaded.push(&row.candidate_id, row.name.as_deref(), &row.metric, row.value)?;
    }
    tracing::info!(
        candidates = loaded.candidate_count(),
        records = loaded.store.score_count(),
        "loaded scores"
    );
    Ok(loaded)
}

/// Random session on the half point grid. Roughly one score in seven is left out so gaps show up
/// in every view.
pub fn demo(candidates: usize, metrics: &MetricSet, seed: u64) -> Result<Loaded, InputError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut loaded = Loaded::empty("Demo session")?;
    for candidate in 0..candidates {
        let id = format!("cand-{:03}", candidate + 1);
        let name = format!("Candidate {}", candidate + 1);
        loaded.candidates.insert(id.clone());
        loaded
            .store
            .add_candidate(Candidate::new(id.clone(), loaded.session.clone(), name.clone()))?;
        for metric in metrics.iter() {
            if !rng.gen_bool(0.85) {
                continue;
            }
            let value = rng.gen_range(0..=20) as f64 / 2.0;
            loaded.push(&id, Some(&name), metric, value)?;
        }
    }
    Ok(loaded)
}
