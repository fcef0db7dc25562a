//! Statistics reconciliation
//!
//! Rebuilds a [`StatsStore`] for a freshly generated universe:
//! - shapes present before and after keep their rolling window (newest W kept)
//! - windows shorter than W are topped up from the history log, newest first
//! - shapes that left the universe are dropped, as are log entries naming them
//!
//! A carried window of length `b` is assumed to already hold the `b` newest
//! log outcomes for its shape, so backfill skips that many matches before
//! prepending older ones. That keeps reconciliation idempotent.

use rand::Rng;

use crate::config::EngineConfig;
use crate::stats::{MasteryTally, SamplingPolicy, ShapeStats, StatsStore};
use crate::types::OutcomeRecord;
use crate::universe::Universe;

/// Counters describing one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Shapes whose window survived the universe change
    pub carried: usize,
    /// Log outcomes prepended into windows
    pub backfilled: usize,
    /// Shapes of the previous universe with no counterpart
    pub dropped: usize,
}

/// Reconcile `previous` stats (with the universe they were aligned to)
/// against `universe`, replaying `log` for missing history.
pub fn reconcile<R: Rng>(
    previous: Option<(&Universe, &StatsStore)>,
    universe: &Universe,
    log: &[OutcomeRecord],
    config: &EngineConfig,
    rng: &mut R,
) -> StatsStore {
    let (store, _) = reconcile_with_summary(previous, universe, log, config, rng);
    store
}

pub fn reconcile_with_summary<R: Rng>(
    previous: Option<(&Universe, &StatsStore)>,
    universe: &Universe,
    log: &[OutcomeRecord],
    config: &EngineConfig,
    rng: &mut R,
) -> (StatsStore, ReconcileSummary) {
    let window = config.window.max(1);
    let n = universe.len();
    let mut stats = vec![ShapeStats::default(); n];
    let mut summary = ReconcileSummary::default();

    if let Some((old_universe, old_stats)) = previous {
        for (old_idx, shape) in old_universe.iter().enumerate() {
            let Some(carried) = old_stats.get(old_idx) else {
                continue;
            };
            match universe.index_of(&shape.key()) {
                Some(new_idx) => {
                    let mut carried = carried.clone();
                    carried.truncate_to(window);
                    stats[new_idx] = carried;
                    summary.carried += 1;
                }
                None => summary.dropped += 1,
            }
        }
    }

    summary.backfilled = backfill(&mut stats, universe, log, window);

    let answers = previous.map(|(_, s)| s.tally().answers()).unwrap_or(0);
    let tally = MasteryTally::resume(SamplingPolicy::from(config), answers);
    let mut store = StatsStore::from_parts(stats, window, config.aim, tally);
    store.recompute_aggregate(rng);

    tracing::info!(
        universe = n,
        carried = summary.carried,
        backfilled = summary.backfilled,
        dropped = summary.dropped,
        mastered = store.aggregate().mastered_count,
        approximate = store.aggregate().is_approximate,
        "stats reconciled"
    );

    (store, summary)
}

/// Top up short windows from the log, newest entry first
fn backfill(
    stats: &mut [ShapeStats],
    universe: &Universe,
    log: &[OutcomeRecord],
    window: usize,
) -> usize {
    // matches already represented by a carried window
    let mut skip: Vec<usize> = stats.iter().map(|s| s.len()).collect();
    let mut open = stats.iter().filter(|s| s.len() < window).count();
    let mut added = 0;

    for entry in log.iter().rev() {
        if open == 0 {
            break;
        }
        let Some(idx) = universe.index_of(&entry.shape.key()) else {
            continue;
        };
        let st = &mut stats[idx];
        if st.len() >= window {
            continue;
        }
        if skip[idx] > 0 {
            skip[idx] -= 1;
            continue;
        }
        st.prepend(entry.correct, window);
        added += 1;
        if st.len() == window {
            open -= 1;
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Constraints, TonalityMode};
    use crate::shape::Shape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rec(shape: &[i32], correct: bool) -> OutcomeRecord {
        OutcomeRecord::new(Shape::from(shape.to_vec()), Shape::from(shape.to_vec()), correct)
    }

    fn window_of(store: &StatsStore, universe: &Universe, shape: &[i32]) -> Vec<bool> {
        store
            .for_shape(universe, &Shape::from(shape.to_vec()))
            .unwrap()
            .outcomes()
            .collect()
    }

    #[test]
    fn test_fresh_replay_takes_newest_w() {
        let config = EngineConfig {
            window: 3,
            ..Default::default()
        };
        let universe = Universe::generate(&Constraints::default());
        let log = vec![
            rec(&[0, 4, 7], false),
            rec(&[0, 4, 7], true),
            rec(&[0, 3, 7], true),
            rec(&[0, 4, 7], false),
            rec(&[0, 4, 7], true),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let store = reconcile(None, &universe, &log, &config, &mut rng);

        assert_eq!(window_of(&store, &universe, &[0, 4, 7]), vec![true, false, true]);
        assert_eq!(window_of(&store, &universe, &[0, 3, 7]), vec![true]);
    }

    #[test]
    fn test_carried_window_survives_narrowing() {
        let config = EngineConfig::default();
        let wide = Universe::generate(&Constraints {
            cardinality: (2, 3),
            ..Default::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut store = reconcile(None, &wide, &[], &config, &mut rng);
        let idx = wide.index_of(&Shape::from(vec![0, 4, 7]).key()).unwrap();
        for i in 0..10 {
            store.record(idx, i >= 2, &mut rng);
        }

        let narrow = Universe::generate(&Constraints::default());
        let (migrated, summary) =
            reconcile_with_summary(Some((&wide, &store)), &narrow, &[], &config, &mut rng);
        let st = migrated.for_shape(&narrow, &Shape::from(vec![0, 4, 7])).unwrap();
        assert_eq!(st.correct(), 8);
        assert_eq!(st.len(), 10);
        assert_eq!(summary.carried, narrow.len());
        assert_eq!(summary.dropped, wide.len() - narrow.len());
    }

    #[test]
    fn test_partial_window_backfilled_without_duplicates() {
        let config = EngineConfig {
            window: 4,
            ..Default::default()
        };
        let universe = Universe::generate(&Constraints::default());
        let log = vec![
            rec(&[0, 4, 7], false),
            rec(&[0, 4, 7], false),
            rec(&[0, 4, 7], true),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        // window built from only the newest entry
        let mut partial = StatsStore::new(universe.len(), &config);
        let idx = universe.index_of(&Shape::from(vec![0, 4, 7]).key()).unwrap();
        partial.record(idx, true, &mut rng);

        let store = reconcile(Some((&universe, &partial)), &universe, &log, &config, &mut rng);
        assert_eq!(window_of(&store, &universe, &[0, 4, 7]), vec![false, false, true]);
    }

    #[test]
    fn test_stale_log_entries_ignored() {
        let config = EngineConfig::default();
        let universe = Universe::generate(&Constraints::default());
        let log = vec![rec(&[0, 1, 2, 3], true), rec(&[5, 9, 12], true)];
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let store = reconcile(None, &universe, &log, &config, &mut rng);
        assert!(store.all().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let config = EngineConfig {
            window: 5,
            ..Default::default()
        };
        let constraints = Constraints {
            tonality: TonalityMode::RandomKey,
            cardinality: (2, 2),
            span: (1, 4),
            ..Default::default()
        };
        let universe = Universe::generate(&constraints);
        let log: Vec<OutcomeRecord> = (0..60)
            .map(|i| {
                let shape = universe.get(i % 7).unwrap().clone();
                OutcomeRecord::new(shape.clone(), shape, i % 3 != 0)
            })
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let first = reconcile(None, &universe, &log, &config, &mut rng);
        let second = reconcile(Some((&universe, &first)), &universe, &log, &config, &mut rng);
        assert_eq!(first.all(), second.all());
        assert_eq!(first.aggregate(), second.aggregate());
    }

    #[test]
    fn test_window_shrink_truncates_carried() {
        let universe = Universe::generate(&Constraints::default());
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut store = StatsStore::new(universe.len(), &EngineConfig::default());
        for outcome in [true, true, false, false, true] {
            store.record(0, outcome, &mut rng);
        }
        let smaller = EngineConfig {
            window: 2,
            ..Default::default()
        };
        let migrated = reconcile(Some((&universe, &store)), &universe, &[], &smaller, &mut rng);
        assert_eq!(
            migrated.get(0).unwrap().outcomes().collect::<Vec<_>>(),
            vec![false, true]
        );
    }
}
