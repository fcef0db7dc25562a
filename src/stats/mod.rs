//! Rolling per-shape statistics
//!
//! Each shape in the universe owns a bounded FIFO of its last W outcomes and
//! a cached correct count. Stats are stored by universe position, so a key
//! lookup through [`Universe::index_of`] gives O(1) access.

pub mod aggregate;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::shape::Shape;
use crate::types::AggregateStats;
use crate::universe::Universe;

pub use aggregate::{MasteryTally, SamplingPolicy};

// ==================== Shape Stats ====================

/// Rolling outcome window for one shape.
/// Serialized as the bare outcome list; the count is rebuilt on load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VecDeque<bool>", into = "VecDeque<bool>")]
pub struct ShapeStats {
    /// Oldest outcome first
    buffer: VecDeque<bool>,
    /// Number of `true` entries in `buffer`
    correct: u32,
}

impl From<VecDeque<bool>> for ShapeStats {
    fn from(buffer: VecDeque<bool>) -> Self {
        let correct = buffer.iter().filter(|b| **b).count() as u32;
        Self { buffer, correct }
    }
}

impl From<ShapeStats> for VecDeque<bool> {
    fn from(stats: ShapeStats) -> Self {
        stats.buffer
    }
}

impl ShapeStats {
    /// Append the newest outcome, evicting the oldest beyond `window`.
    /// Returns the evicted outcome, if any.
    pub fn push(&mut self, correct: bool, window: usize) -> Option<bool> {
        self.buffer.push_back(correct);
        if correct {
            self.correct += 1;
        }
        let mut evicted = None;
        while self.buffer.len() > window {
            if let Some(old) = self.buffer.pop_front() {
                if old {
                    self.correct = self.correct.saturating_sub(1);
                }
                evicted = Some(old);
            }
        }
        evicted
    }

    /// Insert an older outcome in front; no-op once the window is full
    pub fn prepend(&mut self, correct: bool, window: usize) -> bool {
        if self.buffer.len() >= window {
            return false;
        }
        self.buffer.push_front(correct);
        if correct {
            self.correct += 1;
        }
        true
    }

    /// Keep only the newest `window` outcomes
    pub fn truncate_to(&mut self, window: usize) {
        while self.buffer.len() > window {
            if let Some(old) = self.buffer.pop_front() {
                if old {
                    self.correct = self.correct.saturating_sub(1);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn outcomes(&self) -> impl Iterator<Item = bool> + '_ {
        self.buffer.iter().copied()
    }

    /// Rolling accuracy; missing entries count as wrong
    pub fn accuracy(&self, window: usize) -> f64 {
        if window == 0 {
            return 0.0;
        }
        self.correct as f64 / window as f64
    }

    pub fn is_mastered(&self, window: usize, aim: f64) -> bool {
        self.accuracy(window) >= aim
    }
}

// ==================== Stats Store ====================

/// Per-shape stats aligned with a universe, plus the mastered tally
#[derive(Debug, Clone)]
pub struct StatsStore {
    stats: Vec<ShapeStats>,
    window: usize,
    aim: f64,
    tally: MasteryTally,
}

impl StatsStore {
    /// Empty stats for a universe of `len` shapes
    pub fn new(len: usize, config: &EngineConfig) -> Self {
        Self {
            stats: vec![ShapeStats::default(); len],
            window: config.window.max(1),
            aim: config.aim,
            tally: MasteryTally::new(SamplingPolicy::from(config)),
        }
    }

    pub(crate) fn from_parts(stats: Vec<ShapeStats>, window: usize, aim: f64, tally: MasteryTally) -> Self {
        Self {
            stats,
            window,
            aim,
            tally,
        }
    }

    pub(crate) fn tally(&self) -> &MasteryTally {
        &self.tally
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn aim(&self) -> f64 {
        self.aim
    }

    pub fn get(&self, idx: usize) -> Option<&ShapeStats> {
        self.stats.get(idx)
    }

    pub fn all(&self) -> &[ShapeStats] {
        &self.stats
    }

    /// Stats for a shape of `universe`, if it belongs to it
    pub fn for_shape(&self, universe: &Universe, shape: &Shape) -> Option<&ShapeStats> {
        universe
            .index_of(&shape.key())
            .and_then(|idx| self.stats.get(idx))
    }

    pub fn accuracy(&self, idx: usize) -> f64 {
        self.stats
            .get(idx)
            .map(|s| s.accuracy(self.window))
            .unwrap_or(0.0)
    }

    /// Lowest rolling accuracy across the universe (1.0 when empty)
    pub fn minimum_accuracy(&self) -> f64 {
        self.stats
            .iter()
            .map(|s| s.accuracy(self.window))
            .fold(1.0, f64::min)
    }

    /// Record an outcome for the shape at `idx` and update the tally.
    /// Out-of-range indices still count toward the refresh cadence.
    pub fn record<R: Rng>(&mut self, idx: usize, correct: bool, rng: &mut R) {
        let window = self.window;
        let aim = self.aim;

        let (was, now) = match self.stats.get_mut(idx) {
            Some(s) => {
                let was = s.is_mastered(window, aim);
                s.push(correct, window);
                (Some(was), Some(s.is_mastered(window, aim)))
            }
            None => (None, None),
        };

        self.tally
            .on_answer(was, now, &self.stats, window, aim, rng);
    }

    /// Recount the mastered tally from scratch
    pub fn recompute_aggregate<R: Rng>(&mut self, rng: &mut R) {
        self.tally
            .recompute(&self.stats, self.window, self.aim, rng);
    }

    pub fn aggregate(&self) -> AggregateStats {
        self.tally.snapshot(self.stats.len())
    }
}
