//! Common Types and Constants
//!
//! Shared data structures used across the drill engine modules.

use serde::{Deserialize, Serialize};

use crate::shape::Shape;

// ==================== Constants ====================

/// Number of pitch classes per octave
pub const PITCH_CLASSES: i32 = 12;

/// Default rolling window size (W)
pub const DEFAULT_WINDOW: usize = 10;

/// Default accuracy fraction at which a shape counts as mastered
pub const DEFAULT_AIM: f64 = 0.8;

/// Default probability of mastery-weighted selection
pub const DEFAULT_FOCUS_RATIO: f64 = 0.8;

/// Universes larger than this are counted by sampling
pub const DEFAULT_SAMPLE_LIMIT: usize = 150_000;

/// Number of random samples per sampled estimate
pub const DEFAULT_SAMPLE_SIZE: usize = 2_000;

/// Recorded answers between two sampled refreshes
pub const DEFAULT_REFRESH_EVERY: u64 = 500;

/// Lowest MIDI note offered by the settings ranges
pub const MIDI_ABS_LOW: i32 = 20;

/// Highest MIDI note offered by the settings ranges
pub const MIDI_ABS_HIGH: i32 = 100;

/// Largest cardinality offered by the settings ranges
pub const MAX_CARDINALITY: usize = 5;

/// Tie-breaking jitter added to every selection weight
pub const WEIGHT_JITTER: f64 = 1e-12;

/// Total weight below which focused selection falls back to uniform
pub const MIN_TOTAL_WEIGHT: f64 = 1e-12;

// ==================== Outcome Types ====================

/// One answered trial, appended to the history log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Shape that was played
    #[serde(rename = "rel")]
    pub shape: Shape,
    /// Normalized guess as submitted
    pub guess: Shape,
    /// Whether the guess matched
    #[serde(rename = "ok")]
    pub correct: bool,
}

impl OutcomeRecord {
    pub fn new(shape: Shape, guess: Shape, correct: bool) -> Self {
        Self {
            shape,
            guess,
            correct,
        }
    }
}

/// Aggregate mastery statistics for display
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Shapes whose rolling accuracy reached the aim (possibly estimated)
    pub mastered_count: usize,
    /// Size of the current universe
    pub universe_size: usize,
    /// True when `mastered_count` is a sampled estimate
    pub is_approximate: bool,
}

impl AggregateStats {
    /// Fraction of the universe mastered, 0.0 for an empty universe
    pub fn mastered_fraction(&self) -> f64 {
        if self.universe_size == 0 {
            0.0
        } else {
            self.mastered_count as f64 / self.universe_size as f64
        }
    }
}

// ==================== Trial Types ====================

/// A concrete realization of a shape, owned by the session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Shape being drilled
    pub shape: Shape,
    /// MIDI note the shape offsets are added to
    pub root: i32,
    /// Concrete MIDI pitches, ascending
    pub pitches: Vec<i32>,
    /// Per-note gains for playback
    pub gains: Vec<f64>,
    /// Key pitch class the trial is heard against
    pub key_pc: i32,
    /// Whether the learner has answered
    pub answered: bool,
}

/// Result of submitting a guess
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Guess was scored and recorded
    Scored {
        correct: bool,
        truth: Shape,
        guess: Shape,
    },
    /// Guess contained no integers; the trial stays pending
    Indeterminate,
    /// No pending trial to answer
    NoPendingTrial,
}

impl SubmitOutcome {
    /// `Some(correct)` for scored submissions
    pub fn correct(&self) -> Option<bool> {
        match self {
            SubmitOutcome::Scored { correct, .. } => Some(*correct),
            _ => None,
        }
    }
}
