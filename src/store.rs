use std::collections::BTreeMap;

use crate::model::{Candidate, CandidateId, ScoreRecord, Session, SessionId};

/// Read side of the score store that the engine depends on. Each call returns the current
/// snapshot; the engine performs exactly one `fetch_records` per query.
pub trait ScoreStore {
    /// Candidates of the session in insertion order. An existing session without candidates
    /// yields an empty list.
    fn fetch_candidates(&self, session: &SessionId) -> Result<Vec<Candidate>, StoreError>;
    /// Every score record of the session. Later records for the same (candidate, metric) pair
    /// supersede earlier ones.
    fn fetch_records(&self, session: &SessionId) -> Result<Vec<ScoreRecord>, StoreError>;
}

impl<S: ScoreStore + ?Sized> ScoreStore for &S {
    fn fetch_candidates(&self, session: &SessionId) -> Result<Vec<Candidate>, StoreError> {
        (**self).fetch_candidates(session)
    }

    fn fetch_records(&self, session: &SessionId) -> Result<Vec<ScoreRecord>, StoreError> {
        (**self).fetch_records(session)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
struct SessionEntry {
    session: Session,
    candidates: Vec<Candidate>,
    records: Vec<ScoreRecord>,
}

/// `BTreeMap` backed store. Keeps score history: recording a score appends, and the engine picks
/// the latest value per (candidate, metric) pair.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    sessions: BTreeMap<SessionId, SessionEntry>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&mut self, session: Session) -> Result<(), StoreError> {
        if self.sessions.contains_key(&session.id) {
            return Err(StoreError::Conflict(format!("session {}", session.id)));
        }
        self.sessions.insert(
            session.id.clone(),
            SessionEntry {
                session,
                candidates: Vec::new(),
                records: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id).map(|entry| &entry.session)
    }

    /// Sessions ordered by id.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().map(|entry| &entry.session)
    }

    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), StoreError> {
        let entry = self.entry_mut(&candidate.session_id)?;
        if entry.candidates.iter().any(|c| c.id == candidate.id) {
            return Err(StoreError::Conflict(format!("candidate {}", candidate.id)));
        }
        entry.candidates.push(candidate);
        Ok(())
    }

    /// Replaces the display attributes of an existing candidate, keeping its position.
    pub fn update_candidate(&mut self, candidate: Candidate) -> Result<(), StoreError> {
        let entry = self.entry_mut(&candidate.session_id)?;
        let slot = entry
            .candidates
            .iter_mut()
            .find(|c| c.id == candidate.id)
            .ok_or_else(|| StoreError::CandidateNotFound(candidate.id.clone()))?;
        *slot = candidate;
        Ok(())
    }

    /// Appends a score. Range checking is left to the engine.
    pub fn record_score(
        &mut self,
        session: &SessionId,
        record: ScoreRecord,
    ) -> Result<(), StoreError> {
        let entry = self.entry_mut(session)?;
        if !entry.candidates.iter().any(|c| c.id == record.candidate_id) {
            return Err(StoreError::CandidateNotFound(record.candidate_id));
        }
        entry.records.push(record);
        Ok(())
    }

    /// Removes the session together with its candidates and scores.
    pub fn delete_session(&mut self, id: &SessionId) -> Result<Session, StoreError> {
        self.sessions
            .remove(id)
            .map(|entry| entry.session)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))
    }

    pub fn score_count(&self) -> usize {
        self.sessions.values().map(|entry| entry.records.len()).sum()
    }

    fn entry_mut(&mut self, id: &SessionId) -> Result<&mut SessionEntry, StoreError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::SessionNotFound(id.clone()))
    }
}

impl ScoreStore for InMemoryStore {
    fn fetch_candidates(&self, session: &SessionId) -> Result<Vec<Candidate>, StoreError> {
        self.sessions
            .get(session)
            .map(|entry| entry.candidates.clone())
            .ok_or_else(|| StoreError::SessionNotFound(session.clone()))
    }

    fn fetch_records(&self, session: &SessionId) -> Result<Vec<ScoreRecord>, StoreError> {
        self.sessions
            .get(session)
            .map(|entry| entry.records.clone())
            .ok_or_else(|| StoreError::SessionNotFound(session.clone()))
    }
}
