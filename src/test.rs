use std::collections::BTreeMap;

use proptest::{
    prelude::prop,
    prop_assert, prop_assert_eq, prop_compose, prop_oneof, proptest,
    strategy::{Just, Strategy as _},
};
use rand::{rngs::SmallRng, seq::SliceRandom as _, SeedableRng as _};

use crate::{
    Candidate, EngineError, HeatmapOrder, InMemoryStore, MetricSet, Normalized, RankingEngine,
    RankingMode, ScoreRecord, Session, SessionId,
};

#[track_caller]
pub fn assert_within(value: f64, expected: f64, tolerance: f64) {
    let diff = (value - expected).abs();
    assert!(
        diff <= tolerance,
        "Expected value of {expected} +- {tolerance} but got {value} which is off by {diff}",
    );
}

#[track_caller]
pub fn assert_within_normalized(value: Normalized, expected: f64, tolerance: f64) {
    let diff = (value.as_f64() - expected).abs();
    assert!(
        diff <= tolerance,
        "Expected value of {expected} +- {tolerance} but got {value:?} which is off by {diff}",
    );
}

#[derive(Debug)]
struct Fixture {
    session: SessionId,
    metrics: MetricSet,
    /// `scores[candidate][metric]`, candidates in insertion order.
    scores: Vec<Vec<Option<f64>>>,
    store: InMemoryStore,
}

impl Fixture {
    fn new(scores: Vec<Vec<Option<f64>>>, metric_count: usize) -> Self {
        let records = Self::records(&scores);
        Self::with_records(scores, metric_count, records)
    }

    fn records(scores: &[Vec<Option<f64>>]) -> Vec<ScoreRecord> {
        scores
            .iter()
            .enumerate()
            .flat_map(|(candidate, row)| {
                row.iter().enumerate().filter_map(move |(metric, value)| {
                    let candidate = format!("c{candidate:02}");
                    value.map(|v| ScoreRecord::new(candidate, format!("m{metric}"), v))
                })
            })
            .collect()
    }

    fn with_records(
        scores: Vec<Vec<Option<f64>>>,
        metric_count: usize,
        records: Vec<ScoreRecord>,
    ) -> Self {
        let session = SessionId::new("generated");
        let metrics = MetricSet::new((0..metric_count).map(|m| format!("m{m}"))).unwrap();
        let mut store = InMemoryStore::new();
        store
            .create_session(Session {
                id: session.clone(),
                name: "Generated".to_string(),
                interviewer: None,
                date: None,
            })
            .unwrap();
        for candidate in 0..scores.len() {
            let id = format!("c{candidate:02}");
            store
                .add_candidate(Candidate::new(id.clone(), session.clone(), id))
                .unwrap();
        }
        for record in records {
            store.record_score(&session, record).unwrap();
        }
        Self {
            session,
            metrics,
            scores,
            store,
        }
    }

    fn engine(&self) -> RankingEngine<&InMemoryStore> {
        RankingEngine::new(&self.store)
    }

    fn index(&self, id: &str) -> usize {
        id.trim_start_matches('c').parse().unwrap()
    }
}

prop_compose! {
    fn raw_score()(value in prop_oneof![
        (0_u32..=20).prop_map(|half_points| half_points as f64 / 2.0),
        0.0_f64..=10.0,
    ]) -> f64 {
        value
    }
}
prop_compose! {
    fn session_fixture()(metric_count in 1_usize..6, candidate_count in 1_usize..16)
        (
            scores in prop::collection::vec(
                prop::collection::vec(prop::option::weighted(0.8, raw_score()), metric_count),
                candidate_count,
            ),
            metric_count in Just(metric_count),
        ) -> Fixture {
        Fixture::new(scores, metric_count)
    }
}
prop_compose! {
    fn weights()(weights in prop::collection::vec(prop_oneof![Just(0.0), 0.1_f64..5.0], 6)) -> Vec<f64> {
        weights
    }
}

proptest! {
    #[test]
    fn normalized_values_lie_in_unit_interval(fixture in session_fixture()) {
        let normalized = fixture.engine().normalized(&fixture.session, &fixture.metrics).unwrap();
        let recorded = fixture.scores.iter().flatten().filter(|v| v.is_some()).count();
        prop_assert_eq!(normalized.len(), recorded);
        for score in normalized {
            prop_assert!((0.0..=1.0).contains(&score.value.as_f64()));
        }
    }

    #[test]
    fn constant_metric_normalizes_to_midpoint(value in raw_score(), candidates in 1_usize..10) {
        let fixture = Fixture::new(vec![vec![Some(value)]; candidates], 1);
        let normalized = fixture.engine().normalized(&fixture.session, &fixture.metrics).unwrap();
        prop_assert_eq!(normalized.len(), candidates);
        prop_assert!(normalized.iter().all(|score| score.value == Normalized::MIDPOINT));
    }

    #[test]
    fn weighted_average_is_convex(fixture in session_fixture(), weights in weights()) {
        let weights: BTreeMap<String, f64> = fixture
            .metrics
            .iter()
            .zip(&weights)
            .map(|(metric, weight)| (metric.to_string(), *weight))
            .collect();
        let all_zero = weights.values().all(|w| *w == 0.0);
        let result = fixture.engine().rank(
            &fixture.session,
            &fixture.metrics,
            &RankingMode::WeightedAverage { weights },
        );
        if all_zero {
            prop_assert!(matches!(result, Err(EngineError::InvalidWeights(_))));
            return Ok(());
        }
        let result = result.unwrap();
        prop_assert_eq!(result.entries.len(), fixture.scores.len());
        let mut seen_unscored = false;
        for entry in &result.entries {
            match entry.score {
                Some(score) => {
                    prop_assert!(!seen_unscored);
                    prop_assert!((0.0..=1.0).contains(&score));
                }
                None => seen_unscored = true,
            }
        }
    }

    #[test]
    fn single_metric_is_a_consistent_total_order(fixture in session_fixture(), metric in 0_usize..6) {
        let metric = metric % fixture.metrics.len();
        let mode = RankingMode::SingleMetric { metric: format!("m{metric}") };
        let result = fixture.engine().rank(&fixture.session, &fixture.metrics, &mode).unwrap();
        prop_assert_eq!(result.entries.len(), fixture.scores.len());

        let others = |index: usize| -> f64 {
            fixture.scores[index]
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != metric)
                .filter_map(|(_, v)| *v)
                .sum()
        };
        for (position, pair) in result.entries.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert_eq!(a.rank, position + 1);
            let (ia, ib) = (fixture.index(a.candidate_id.as_str()), fixture.index(b.candidate_id.as_str()));
            prop_assert_eq!(a.score, fixture.scores[ia][metric]);
            match (a.score, b.score) {
                (Some(x), Some(y)) => {
                    prop_assert!(x >= y);
                    if x == y {
                        prop_assert!(others(ia) >= others(ib));
                        if others(ia) == others(ib) {
                            prop_assert!(ia < ib);
                        }
                    }
                }
                (None, Some(_)) => prop_assert!(false, "unscored candidate ranked first"),
                (Some(_), None) => {}
                (None, None) => prop_assert!(ia < ib),
            }
        }
    }

    #[test]
    fn composite_equals_unit_weights(fixture in session_fixture()) {
        let engine = fixture.engine();
        let weights = fixture.metrics.iter().map(|m| (m.to_string(), 1.0)).collect();
        let weighted = engine
            .rank(&fixture.session, &fixture.metrics, &RankingMode::WeightedAverage { weights })
            .unwrap();
        let composite = engine
            .rank(&fixture.session, &fixture.metrics, &RankingMode::Composite)
            .unwrap();
        prop_assert_eq!(weighted.entries, composite.entries);
    }

    #[test]
    fn distributions_account_for_every_candidate(fixture in session_fixture(), width in 0.25_f64..=10.0) {
        let snapshot = fixture.engine().snapshot(&fixture.session, &fixture.metrics, width).unwrap();
        for distribution in &snapshot.distributions {
            prop_assert_eq!(distribution.total(), fixture.scores.len());
        }
        prop_assert_eq!(snapshot.radar.len(), fixture.scores.len());
        for vector in &snapshot.radar {
            prop_assert_eq!(vector.axes.len(), fixture.metrics.len());
        }
        prop_assert_eq!(snapshot.heatmap.rows.len(), fixture.scores.len());
    }

    #[test]
    fn queries_are_idempotent_and_independent_of_record_order(fixture in session_fixture(), seed: u64) {
        let mut records = Fixture::records(&fixture.scores);
        records.shuffle(&mut SmallRng::seed_from_u64(seed));
        let shuffled = Fixture::with_records(fixture.scores.clone(), fixture.metrics.len(), records);

        let query = |fixture: &Fixture| -> (String, String, String) {
            let engine = fixture.engine();
            let ranking = engine
                .rank(&fixture.session, &fixture.metrics, &RankingMode::Composite)
                .unwrap();
            let snapshot = engine.snapshot(&fixture.session, &fixture.metrics, 2.0).unwrap();
            let heatmap = engine
                .heatmap(
                    &fixture.session,
                    &fixture.metrics,
                    &HeatmapOrder::Ranking { mode: RankingMode::Composite },
                )
                .unwrap();
            (
                serde_json::to_string(&ranking).unwrap(),
                serde_json::to_string(&snapshot).unwrap(),
                serde_json::to_string(&heatmap).unwrap(),
            )
        };
        let first = query(&fixture);
        prop_assert_eq!(&first, &query(&fixture));
        prop_assert_eq!(&first, &query(&shuffled));
    }
}
