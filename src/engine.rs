use serde::Serialize;

use crate::aggregate::distribution::{bucket_count, distribution};
use crate::aggregate::heatmap::heatmap;
use crate::aggregate::radar::radar;
use crate::aggregate::summary::summarize;
use crate::aggregate::{AggregateSnapshot, Distribution, Heatmap, RadarVector, SessionSummary};
use crate::export::{export_table, ExportTable};
use crate::model::{CandidateId, MetricSet, SessionId};
use crate::normalize::{normalize, NormalizedScore, ScoreTable};
use crate::rank::{rank, RankingMode, RankingResult};
use crate::store::ScoreStore;
use crate::EngineError;

/// Row order of a heatmap.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum HeatmapOrder {
    #[default]
    Insertion,
    Ranking { mode: RankingMode },
}

/// Query surface over a score store. Holds no state besides the store handle: each query fetches
/// the session once, normalizes from scratch and discards everything afterwards.
///
/// The metric set is passed to every query, so metrics can be added or reordered without touching
/// the engine.
#[derive(Clone, Debug)]
pub struct RankingEngine<S> {
    store: S,
}

impl<S: ScoreStore> RankingEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn load<'m>(
        &self,
        session: &SessionId,
        metrics: &'m MetricSet,
    ) -> Result<ScoreTable<'m>, EngineError> {
        let candidates = self.store.fetch_candidates(session)?;
        let records = self.store.fetch_records(session)?;
        tracing::debug!(
            %session,
            candidates = candidates.len(),
            records = records.len(),
            metrics = metrics.len(),
            "loaded session scores"
        );
        ScoreTable::build(metrics, candidates, &records)
    }

    /// Normalized value of every recorded (candidate, metric) pair.
    pub fn normalized(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
    ) -> Result<Vec<NormalizedScore>, EngineError> {
        let table = self.load(session, metrics)?;
        Ok(normalize(&table).records(&table))
    }

    /// Order the session's candidates best-first under `mode`.
    pub fn rank(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        mode: &RankingMode,
    ) -> Result<RankingResult, EngineError> {
        let plan = mode.plan(metrics)?;
        let table = self.load(session, metrics)?;
        let result = rank(&table, &normalize(&table), mode, &plan);
        tracing::debug!(%session, mode = mode.name(), entries = result.entries.len(), "ranked");
        Ok(result)
    }

    pub fn distribution(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        metric: &str,
        bucket_width: f64,
    ) -> Result<Distribution, EngineError> {
        let column = metrics.require(metric)?;
        bucket_count(bucket_width)?;
        let table = self.load(session, metrics)?;
        distribution(&table, column, bucket_width)
    }

    pub fn heatmap(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        order: &HeatmapOrder,
    ) -> Result<Heatmap, EngineError> {
        match order {
            HeatmapOrder::Insertion => {
                let table = self.load(session, metrics)?;
                Ok(heatmap(&table, None))
            }
            HeatmapOrder::Ranking { mode } => {
                let plan = mode.plan(metrics)?;
                let table = self.load(session, metrics)?;
                let ranking = rank(&table, &normalize(&table), mode, &plan);
                Ok(heatmap(&table, Some(&ranking)))
            }
        }
    }

    pub fn radar(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        candidate: &CandidateId,
    ) -> Result<RadarVector, EngineError> {
        let table = self.load(session, metrics)?;
        let index = table
            .candidate_index(candidate)
            .ok_or_else(|| EngineError::CandidateNotFound(candidate.clone()))?;
        Ok(radar(&table, &normalize(&table), index))
    }

    /// Distributions for every metric, the heatmap in insertion order and every radar vector,
    /// all from one fetch.
    pub fn snapshot(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        bucket_width: f64,
    ) -> Result<AggregateSnapshot, EngineError> {
        bucket_count(bucket_width)?;
        let table = self.load(session, metrics)?;
        let normalized = normalize(&table);
        let distributions = (0..metrics.len())
            .map(|column| distribution(&table, column, bucket_width))
            .collect::<Result<Vec<_>, _>>()?;
        let radar = (0..table.candidates().len())
            .map(|index| radar(&table, &normalized, index))
            .collect();
        Ok(AggregateSnapshot {
            distributions,
            heatmap: heatmap(&table, None),
            radar,
        })
    }

    pub fn summary(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
    ) -> Result<SessionSummary, EngineError> {
        let table = self.load(session, metrics)?;
        Ok(summarize(&table, &normalize(&table)))
    }

    /// Flat table in ranking order, ready for CSV download.
    pub fn export(
        &self,
        session: &SessionId,
        metrics: &MetricSet,
        mode: &RankingMode,
    ) -> Result<ExportTable, EngineError> {
        let plan = mode.plan(metrics)?;
        let table = self.load(session, metrics)?;
        let ranking = rank(&table, &normalize(&table), mode, &plan);
        Ok(export_table(&table, &ranking))
    }
}

#[cfg(test)]
mod test {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use super::{HeatmapOrder, RankingEngine};
    use crate::model::{Candidate, CandidateId, MetricSet, ScoreRecord, Session, SessionId};
    use crate::rank::RankingMode;
    use crate::store::{InMemoryStore, ScoreStore, StoreError};
    use crate::test::assert_within;
    use crate::EngineError;

    fn example_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        let session = SessionId::new("spring");
        store
            .create_session(Session {
                id: session.clone(),
                name: "Spring hiring".to_string(),
                interviewer: Some("Grace".to_string()),
                date: Some("2026-03-01".to_string()),
            })
            .unwrap();
        store
            .add_candidate(Candidate::new("a", session.clone(), "Ada"))
            .unwrap();
        store
            .add_candidate(Candidate::new("b", session.clone(), "Bo"))
            .unwrap();
        for (candidate, metric, value) in [
            ("a", "Communication", 8.0),
            ("a", "Technical", 6.0),
            ("b", "Communication", 5.0),
            ("b", "Technical", 9.0),
        ] {
            store
                .record_score(&session, ScoreRecord::new(candidate, metric, value))
                .unwrap();
        }
        store
    }

    fn metrics() -> MetricSet {
        MetricSet::new(["Communication", "Technical"]).unwrap()
    }

    #[test]
    fn worked_example() {
        let engine = RankingEngine::new(example_store());
        let session = SessionId::new("spring");
        let metrics = metrics();

        let single = engine
            .rank(
                &session,
                &metrics,
                &RankingMode::SingleMetric {
                    metric: "Communication".to_string(),
                },
            )
            .unwrap();
        let ids: Vec<&str> = single.entries.iter().map(|e| e.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let weights = BTreeMap::from([
            ("Communication".to_string(), 0.6),
            ("Technical".to_string(), 0.4),
        ]);
        let weighted = engine
            .rank(&session, &metrics, &RankingMode::WeightedAverage { weights })
            .unwrap();
        assert_eq!(weighted.entries[0].candidate_id.as_str(), "a");
        assert_within(weighted.entries[0].score.unwrap(), 0.6, 1e-12);
        assert_within(weighted.entries[1].score.unwrap(), 0.4, 1e-12);

        let dist = engine
            .distribution(&session, &metrics, "Communication", 2.0)
            .unwrap();
        assert_eq!(dist.count("[4, 6)"), Some(1));
        assert_eq!(dist.count("[8, 10]"), Some(1));
        assert_eq!(dist.unscored, 0);

        let normalized = engine.normalized(&session, &metrics).unwrap();
        assert_eq!(normalized.len(), 4);
        assert_eq!(normalized[0].value.as_f64(), 1.0);
    }

    #[test]
    fn reports_missing_session_and_bad_parameters() {
        let engine = RankingEngine::new(example_store());
        let metrics = metrics();
        let missing = SessionId::new("autumn");
        assert!(matches!(
            engine.rank(&missing, &metrics, &RankingMode::Composite),
            Err(EngineError::SessionNotFound(id)) if id == missing
        ));

        let session = SessionId::new("spring");
        assert!(matches!(
            engine.distribution(&session, &metrics, "Culture Fit", 2.0),
            Err(EngineError::MetricNotFound(_))
        ));
        assert!(matches!(
            engine.distribution(&session, &metrics, "Technical", 0.0),
            Err(EngineError::InvalidBucketWidth(_))
        ));
        assert!(matches!(
            engine.radar(&session, &metrics, &CandidateId::new("zed")),
            Err(EngineError::CandidateNotFound(_))
        ));
    }

    #[test]
    fn out_of_range_scores_surface_with_their_origin() {
        let mut store = example_store();
        let session = SessionId::new("spring");
        store
            .record_score(&session, ScoreRecord::new("b", "Technical", 12.0))
            .unwrap();
        let engine = RankingEngine::new(&store);
        match engine.summary(&session, &metrics()) {
            Err(EngineError::ScoreOutOfRange {
                candidate, metric, ..
            }) => {
                assert_eq!(candidate.as_str(), "b");
                assert_eq!(metric, "Technical");
            }
            other => panic!("expected ScoreOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn sees_writes_between_queries() {
        let mut store = example_store();
        let session = SessionId::new("spring");
        let before = RankingEngine::new(&store)
            .rank(&session, &metrics(), &RankingMode::Composite)
            .unwrap();
        store
            .record_score(&session, ScoreRecord::new("a", "Technical", 10.0))
            .unwrap();
        let after = RankingEngine::new(&store)
            .rank(&session, &metrics(), &RankingMode::Composite)
            .unwrap();
        assert_ne!(before, after);
        assert_eq!(after.entries[0].score, Some(1.0));
    }

    #[test]
    fn session_without_candidates_yields_empty_results() {
        let mut store = InMemoryStore::new();
        let session = SessionId::new("empty");
        store
            .create_session(Session {
                id: session.clone(),
                name: "Not started".to_string(),
                interviewer: None,
                date: None,
            })
            .unwrap();
        let engine = RankingEngine::new(store);
        let metrics = metrics();

        let ranking = engine
            .rank(&session, &metrics, &RankingMode::Composite)
            .unwrap();
        assert!(ranking.entries.is_empty());

        let dist = engine
            .distribution(&session, &metrics, "Technical", 2.0)
            .unwrap();
        assert_eq!(dist.total(), 0);
        assert_eq!(dist.buckets.len(), 5);

        let snapshot = engine.snapshot(&session, &metrics, 2.0).unwrap();
        assert_eq!(snapshot.distributions.len(), 2);
        assert!(snapshot.heatmap.rows.is_empty());
        assert!(snapshot.radar.is_empty());

        let summary = engine.summary(&session, &metrics).unwrap();
        assert_eq!(summary.total_candidates, 0);
        assert_eq!(summary.evaluated_candidates, 0);
        assert_eq!(summary.average_score, None);
        assert_eq!(summary.highest_score, None);
    }

    #[test]
    fn tiny_bucket_widths_are_rejected() {
        let engine = RankingEngine::new(example_store());
        let session = SessionId::new("spring");
        for width in [1e-300, 1e-7] {
            assert!(matches!(
                engine.distribution(&session, &metrics(), "Communication", width),
                Err(EngineError::InvalidBucketWidth(_))
            ));
            assert!(matches!(
                engine.snapshot(&session, &metrics(), width),
                Err(EngineError::InvalidBucketWidth(_))
            ));
        }
    }

    struct CountingStore {
        inner: InMemoryStore,
        fetches: Cell<usize>,
    }

    impl ScoreStore for CountingStore {
        fn fetch_candidates(&self, session: &SessionId) -> Result<Vec<Candidate>, StoreError> {
            self.inner.fetch_candidates(session)
        }

        fn fetch_records(&self, session: &SessionId) -> Result<Vec<ScoreRecord>, StoreError> {
            self.fetches.set(self.fetches.get() + 1);
            self.inner.fetch_records(session)
        }
    }

    #[test]
    fn one_fetch_per_query_and_none_for_invalid_parameters() {
        let engine = RankingEngine::new(CountingStore {
            inner: example_store(),
            fetches: Cell::new(0),
        });
        let session = SessionId::new("spring");
        let metrics = metrics();

        let snapshot = engine.snapshot(&session, &metrics, 2.0).unwrap();
        assert_eq!(snapshot.distributions.len(), 2);
        assert_eq!(snapshot.radar.len(), 2);
        assert_eq!(engine.store().fetches.get(), 1);

        let heatmap = engine
            .heatmap(
                &session,
                &metrics,
                &HeatmapOrder::Ranking {
                    mode: RankingMode::SingleMetric {
                        metric: "Technical".to_string(),
                    },
                },
            )
            .unwrap();
        assert_eq!(heatmap.rows[0].candidate_id.as_str(), "b");
        assert_eq!(engine.store().fetches.get(), 2);

        let invalid = RankingMode::WeightedAverage {
            weights: BTreeMap::from([("Technical".to_string(), 0.0)]),
        };
        assert!(matches!(
            engine.rank(&session, &metrics, &invalid),
            Err(EngineError::InvalidWeights(_))
        ));
        assert_eq!(engine.store().fetches.get(), 2);
    }

    #[test]
    fn store_outage_is_not_a_missing_session() {
        struct Down;
        impl ScoreStore for Down {
            fn fetch_candidates(&self, _: &SessionId) -> Result<Vec<Candidate>, StoreError> {
                Err(StoreError::Unavailable("connection refused".to_string()))
            }
            fn fetch_records(&self, _: &SessionId) -> Result<Vec<ScoreRecord>, StoreError> {
                Err(StoreError::Unavailable("connection refused".to_string()))
            }
        }
        let engine = RankingEngine::new(Down);
        assert!(matches!(
            engine.summary(&SessionId::new("spring"), &metrics()),
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn export_follows_ranking_and_is_repeatable() {
        let engine = RankingEngine::new(example_store());
        let session = SessionId::new("spring");
        let first = engine
            .export(&session, &metrics(), &RankingMode::Composite)
            .unwrap()
            .to_csv_string()
            .unwrap();
        let second = engine
            .export(&session, &metrics(), &RankingMode::Composite)
            .unwrap()
            .to_csv_string()
            .unwrap();
        assert_eq!(first, second);
        let header = first.lines().next().unwrap();
        assert_eq!(
            header,
            "candidate_id,name,email,position,experience_years,Communication,Technical,score,rank"
        );
    }
}
