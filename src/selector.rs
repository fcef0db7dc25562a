//! Weighted trial selection
//!
//! Mixes two policies:
//! - with probability `focus_ratio`, sample proportional to
//!   `max(0, aim - accuracy)` plus a tiny jitter; if every shape is mastered
//!   the total weight vanishes and the draw falls back to uniform
//! - otherwise, draw uniformly so mastered shapes keep appearing

use rand::Rng;

use crate::config::EngineConfig;
use crate::stats::StatsStore;
use crate::types::{MIN_TOTAL_WEIGHT, WEIGHT_JITTER};
use crate::universe::Universe;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selector {
    aim: f64,
    focus_ratio: f64,
}

impl Selector {
    pub fn new(aim: f64, focus_ratio: f64) -> Self {
        Self {
            aim,
            focus_ratio: focus_ratio.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.aim, config.focus_ratio)
    }

    /// Universe index of the next shape to drill, `None` for an empty universe
    pub fn pick<R: Rng>(&self, universe: &Universe, stats: &StatsStore, rng: &mut R) -> Option<usize> {
        let n = universe.len();
        if n == 0 {
            return None;
        }

        if rng.gen::<f64>() < self.focus_ratio {
            return Some(self.pick_weighted(n, stats, rng));
        }

        Some(rng.gen_range(0..n))
    }

    fn pick_weighted<R: Rng>(&self, n: usize, stats: &StatsStore, rng: &mut R) -> usize {
        let weights: Vec<f64> = (0..n)
            .map(|i| (self.aim - stats.accuracy(i)).max(0.0) + rng.gen::<f64>() * WEIGHT_JITTER)
            .collect();
        let total: f64 = weights.iter().sum();

        if !total.is_finite() || total <= MIN_TOTAL_WEIGHT {
            return rng.gen_range(0..n);
        }

        let mut r = rng.gen::<f64>() * total;
        for (i, w) in weights.iter().enumerate() {
            r -= w;
            if r <= 0.0 {
                return i;
            }
        }
        // rounding left a sliver of weight
        n - 1
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Constraints;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_universe() -> Universe {
        Universe::generate(&Constraints {
            cardinality: (2, 2),
            span: (1, 4),
            ..Default::default()
        })
    }

    #[test]
    fn test_empty_universe_yields_none() {
        let universe = Universe::default();
        let stats = StatsStore::new(0, &EngineConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(Selector::default().pick(&universe, &stats, &mut rng), None);
    }

    #[test]
    fn test_focus_avoids_mastered_shapes() {
        let config = EngineConfig::default();
        let universe = small_universe();
        let mut stats = StatsStore::new(universe.len(), &config);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // master everything except index 2
        for idx in [0, 1, 3] {
            for _ in 0..10 {
                stats.record(idx, true, &mut rng);
            }
        }

        let selector = Selector::new(0.8, 1.0);
        for _ in 0..200 {
            assert_eq!(selector.pick(&universe, &stats, &mut rng), Some(2));
        }
    }

    #[test]
    fn test_all_mastered_falls_back_to_uniform() {
        let config = EngineConfig::default();
        let universe = small_universe();
        let mut stats = StatsStore::new(universe.len(), &config);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for idx in 0..universe.len() {
            for _ in 0..10 {
                stats.record(idx, true, &mut rng);
            }
        }

        let selector = Selector::new(0.8, 1.0);
        let mut seen = vec![0usize; universe.len()];
        for _ in 0..2_000 {
            let idx = selector.pick(&universe, &stats, &mut rng).unwrap();
            seen[idx] += 1;
        }
        assert!(seen.iter().all(|&c| c > 300), "uniform fallback expected, got {:?}", seen);
    }

    #[test]
    fn test_zero_focus_is_uniform() {
        let config = EngineConfig::default();
        let universe = small_universe();
        let mut stats = StatsStore::new(universe.len(), &config);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        // skew mastery heavily; uniform branch must ignore it
        for _ in 0..10 {
            stats.record(0, true, &mut rng);
        }

        let selector = Selector::new(0.8, 0.0);
        let draws = 40_000;
        let mut seen = vec![0usize; universe.len()];
        for _ in 0..draws {
            seen[selector.pick(&universe, &stats, &mut rng).unwrap()] += 1;
        }
        let expected = draws as f64 / universe.len() as f64;
        for count in seen {
            let rel = (count as f64 - expected).abs() / expected;
            assert!(rel < 0.05, "count {} deviates from {}", count, expected);
        }
    }

    #[test]
    fn test_weak_shapes_over_represented() {
        let config = EngineConfig::default();
        let universe = small_universe();
        let mut stats = StatsStore::new(universe.len(), &config);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // index 0 at 7/10, index 1 untouched (0/10)
        for i in 0..10 {
            stats.record(0, i < 7, &mut rng);
        }

        let selector = Selector::new(0.8, 1.0);
        let mut weak = 0;
        let mut near = 0;
        for _ in 0..4_000 {
            match selector.pick(&universe, &stats, &mut rng) {
                Some(0) => near += 1,
                Some(1) => weak += 1,
                _ => {}
            }
        }
        assert!(weak > near * 4, "weak {} near {}", weak, near);
    }
}
