//! # pitchset-drill - adaptive ear-training engine for pitch sets
//!
//! Drills a learner on recognising pitch-set shapes (chords described as
//! semitone offsets) and spends practice on the shapes they miss:
//!
//! - **Universe** - every shape allowed by cardinality, span, tonality and range
//! - **Stats** - rolling right/wrong windows per shape with an exact or sampled mastered count
//! - **Selector** - weighted draw toward unmastered shapes, mixed with uniform draws
//! - **Migration** - carries statistics across settings changes and replays history
//!
//! ## Modules
//!
//! - [`shape`] - shapes and their canonical keys
//! - [`universe`] - enumeration, transposition and tonal filtering
//! - [`stats`] - rolling windows and the mastered tally
//! - [`migration`] - reconciliation after the universe changes
//! - [`selector`] - next-shape selection
//! - [`session`] - trial lifecycle and realization
//! - [`guess`] - guess parsing and octave shorthand
//! - [`playback`] - audio cues and the sink they go to
//! - [`history`] - per-tonality logs and snapshots
//! - [`trainer`] - the façade hosts drive
//! - [`config`] / [`error`] / [`logging`] / [`types`]
//!
//! ## Example
//!
//! ```rust
//! use pitchset_drill::{Constraints, EngineConfig, Trainer};
//!
//! let config = EngineConfig { seed: Some(7), ..Default::default() };
//! let mut trainer = Trainer::new(config, Constraints::default()).unwrap();
//!
//! let trial = trainer.request_trial().unwrap();
//! let submission = trainer.submit("0 4 7");
//! assert!(submission.feedback.is_some());
//! assert_eq!(trainer.history().total(), 1);
//! # let _ = trial;
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod guess;
pub mod history;
pub mod logging;
pub mod migration;
pub mod playback;
pub mod selector;
pub mod session;
pub mod shape;
pub mod stats;
pub mod trainer;
pub mod types;
pub mod universe;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use config::{Constraints, EngineConfig, PlaybackConfig, ScaleMode, SettingRanges, TonalityMode};
pub use error::{EngineError, Result};
pub use history::{HistoryBook, LogTag, TrainerSnapshot};
pub use migration::{reconcile, ReconcileSummary};
pub use playback::{AudioSink, CueKind, NullSink, PlaybackCue, RecordingSink};
pub use selector::Selector;
pub use session::{SessionState, TrialPhase};
pub use shape::{Shape, ShapeKey};
pub use stats::{MasteryTally, SamplingPolicy, ShapeStats, StatsStore};
pub use trainer::{FeedbackReport, Submission, Trainer};
pub use universe::{EnumerationBounds, ShapeEnumerator, Universe};
