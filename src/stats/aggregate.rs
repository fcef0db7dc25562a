//! Mastered-shape tally
//!
//! One counter, two strategies: an exact scan for universes up to
//! `sample_limit`, a Monte-Carlo estimate above it. Both are nudged on every
//! answer when a shape crosses the aim; the estimate is also re-sampled every
//! `refresh_every` answers so drift stays bounded.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::stats::ShapeStats;
use crate::types::AggregateStats;

/// Sampling thresholds for the tally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingPolicy {
    pub sample_limit: usize,
    pub sample_size: usize,
    pub refresh_every: u64,
}

impl From<&EngineConfig> for SamplingPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_limit: config.sample_limit,
            sample_size: config.sample_size.max(1),
            refresh_every: config.refresh_every.max(1),
        }
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct MasteryTally {
    policy: SamplingPolicy,
    mastered: usize,
    approximate: bool,
    answers: u64,
}

impl MasteryTally {
    pub fn new(policy: SamplingPolicy) -> Self {
        Self {
            policy,
            mastered: 0,
            approximate: false,
            answers: 0,
        }
    }

    /// Fresh tally that keeps counting answers from a previous one
    pub fn resume(policy: SamplingPolicy, answers: u64) -> Self {
        Self {
            answers,
            ..Self::new(policy)
        }
    }

    /// Recount from scratch, choosing the strategy by universe size
    pub fn recompute<R: Rng>(
        &mut self,
        stats: &[ShapeStats],
        window: usize,
        aim: f64,
        rng: &mut R,
    ) {
        let n = stats.len();
        if n <= self.policy.sample_limit {
            self.mastered = stats.iter().filter(|s| s.is_mastered(window, aim)).count();
            self.approximate = false;
        } else {
            self.mastered = Self::estimate(stats, window, aim, self.policy.sample_size, rng);
            self.approximate = true;
        }
    }

    fn estimate<R: Rng>(
        stats: &[ShapeStats],
        window: usize,
        aim: f64,
        sample_size: usize,
        rng: &mut R,
    ) -> usize {
        let n = stats.len();
        if n == 0 {
            return 0;
        }
        let k = sample_size.min(n);
        let hits = (0..k)
            .filter(|_| stats[rng.gen_range(0..n)].is_mastered(window, aim))
            .count();
        let estimate = (hits as f64 / k as f64 * n as f64).round() as usize;
        estimate.min(n)
    }

    /// Apply one recorded answer: nudge on threshold crossings, refresh the
    /// estimate every `refresh_every` answers
    pub fn on_answer<R: Rng>(
        &mut self,
        was_mastered: Option<bool>,
        is_mastered: Option<bool>,
        stats: &[ShapeStats],
        window: usize,
        aim: f64,
        rng: &mut R,
    ) {
        let n = stats.len();
        match (was_mastered, is_mastered) {
            (Some(false), Some(true)) => self.mastered = (self.mastered + 1).min(n),
            (Some(true), Some(false)) => self.mastered = self.mastered.saturating_sub(1),
            _ => {}
        }

        self.answers += 1;
        if self.approximate && self.answers % self.policy.refresh_every == 0 {
            self.mastered = Self::estimate(stats, window, aim, self.policy.sample_size, rng);
            tracing::debug!(
                answers = self.answers,
                estimate = self.mastered,
                "approximate mastery refreshed"
            );
        }
        self.mastered = self.mastered.min(n);
    }

    pub fn snapshot(&self, universe_size: usize) -> AggregateStats {
        AggregateStats {
            mastered_count: self.mastered.min(universe_size),
            universe_size,
            is_approximate: self.approximate,
        }
    }

    pub fn answers(&self) -> u64 {
        self.answers
    }
}
