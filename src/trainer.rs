//! Drill trainer
//!
//! Owns one learner's drill: settings, universe, statistics, history and the
//! current trial. Hosts drive it through a handful of calls:
//! - `request_trial` / `submit` / `replay` / `play_guess` for the drill loop
//! - `change_settings` when the learner edits constraints
//! - `switch_learner` / `snapshot` to load and save a learner
//!
//! Every call is synchronous. Audio goes out through the injected sink.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Constraints, EngineConfig, SettingRanges, TonalityMode};
use crate::error::Result;
use crate::guess::{expand_octave_notation, parse_guess};
use crate::history::{HistoryBook, LogTag, TrainerSnapshot};
use crate::migration;
use crate::playback::{AudioSink, NullSink};
use crate::selector::Selector;
use crate::session::{SessionState, TrialPhase};
use crate::shape::Shape;
use crate::stats::StatsStore;
use crate::types::{AggregateStats, OutcomeRecord, SubmitOutcome, Trial};
use crate::universe::Universe;

/// Summary shown to the learner after a scored answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub correct: bool,
    pub truth: Shape,
    pub guess: Shape,
    /// Correct answers in the truth shape's rolling window
    pub rolling_correct: u32,
    pub window: usize,
    /// Lowest rolling accuracy in the universe, scaled to the window
    pub minimum_correct: u32,
    /// Share of correct answers in the active log, rounded
    pub overall_percent: u32,
    pub aggregate: AggregateStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub outcome: SubmitOutcome,
    /// Present when the outcome was scored
    pub feedback: Option<FeedbackReport>,
}

pub struct Trainer<S = NullSink> {
    config: EngineConfig,
    constraints: Constraints,
    universe: Universe,
    stats: StatsStore,
    selector: Selector,
    session: SessionState,
    history: HistoryBook,
    rng: ChaCha8Rng,
    sink: S,
}

impl Trainer<NullSink> {
    /// Trainer for a new learner that plays nothing
    pub fn new(config: EngineConfig, constraints: Constraints) -> Result<Self> {
        Self::with_sink(config, constraints, NullSink)
    }
}

impl<S: AudioSink> Trainer<S> {
    pub fn with_sink(config: EngineConfig, constraints: Constraints, sink: S) -> Result<Self> {
        config.validate()?;
        check_constraints(&constraints)?;

        let seed = config.seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        });
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let universe = Universe::generate(&constraints);
        let stats = migration::reconcile(None, &universe, &[], &config, &mut rng);

        Ok(Self {
            selector: Selector::from_config(&config),
            config,
            constraints,
            universe,
            stats,
            session: SessionState::new(),
            history: HistoryBook::new(),
            rng,
            sink,
        })
    }

    /// Trainer resuming a stored learner
    pub fn from_snapshot(config: EngineConfig, snapshot: TrainerSnapshot, sink: S) -> Result<Self> {
        let mut trainer = Self::with_sink(config, snapshot.settings.clone(), sink)?;
        trainer.switch_learner(snapshot)?;
        Ok(trainer)
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    pub fn history(&self) -> &HistoryBook {
        &self.history
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn phase(&self) -> TrialPhase {
        self.session.phase()
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.session.current()
    }

    pub fn aggregate(&self) -> AggregateStats {
        self.stats.aggregate()
    }

    pub fn option_ranges(&self) -> SettingRanges {
        self.constraints.option_ranges()
    }

    /// Log bucket for the current settings
    pub fn tag(&self) -> LogTag {
        LogTag::for_settings(&self.constraints)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ==================== Learner & Settings ====================

    pub fn snapshot(&self) -> TrainerSnapshot {
        TrainerSnapshot {
            settings: self.constraints.clone(),
            logs: self.history.clone(),
        }
    }

    /// Replace the learner: settings and history come from `snapshot`,
    /// statistics are rebuilt from its log alone.
    pub fn switch_learner(&mut self, snapshot: TrainerSnapshot) -> Result<()> {
        check_constraints(&snapshot.settings)?;
        self.sink.stop_all();

        self.session = SessionState::new();
        self.constraints = snapshot.settings;
        self.history = snapshot.logs;
        self.universe = Universe::generate(&self.constraints);

        let log = self.history.replay_log(self.tag());
        self.stats = migration::reconcile(None, &self.universe, &log, &self.config, &mut self.rng);

        tracing::info!(
            tag = self.tag().as_str(),
            logged = self.history.total(),
            universe = self.universe.len(),
            "learner switched"
        );
        Ok(())
    }

    pub fn load_snapshot_json(&mut self, json: &str) -> Result<()> {
        let snapshot = TrainerSnapshot::from_json(json)?;
        self.switch_learner(snapshot)
    }

    /// Apply new constraints: rebuild the universe and reconcile statistics.
    ///
    /// Windows carry over while the log bucket stays the same; moving to
    /// another bucket rebuilds from that bucket's log.
    pub fn change_settings(&mut self, constraints: Constraints) -> Result<()> {
        check_constraints(&constraints)?;

        let old_tag = self.tag();
        let new_tag = LogTag::for_settings(&constraints);
        let universe = Universe::generate(&constraints);
        let log = self.history.replay_log(new_tag);

        let previous = (old_tag == new_tag).then_some((&self.universe, &self.stats));
        let stats = migration::reconcile(previous, &universe, &log, &self.config, &mut self.rng);

        let tonality_changed = constraints.tonality != self.constraints.tonality;
        if tonality_changed || constraints.scale != self.constraints.scale {
            self.session.clear();
        } else {
            self.session.revalidate(&universe);
        }
        if tonality_changed {
            self.session.forget_cued_key();
        }

        tracing::info!(
            from = old_tag.as_str(),
            to = new_tag.as_str(),
            universe = universe.len(),
            "settings changed"
        );

        self.constraints = constraints;
        self.universe = universe;
        self.stats = stats;
        Ok(())
    }

    // ==================== Drill Loop ====================

    /// The pending trial, or a new one announced through the sink.
    /// `None` when the universe is empty or nothing fits the MIDI range.
    pub fn request_trial(&mut self) -> Option<Trial> {
        let fresh = self.session.phase() != TrialPhase::Pending;

        let trial = self
            .session
            .request_trial(
                &self.universe,
                &self.stats,
                &self.selector,
                &self.constraints,
                &self.config.playback,
                &mut self.rng,
            )?
            .clone();

        if fresh {
            self.sink.stop_all();
            for cue in self.session.intro_cues(&self.constraints, &self.config.playback) {
                self.sink.play(&cue);
            }
        }
        Some(trial)
    }

    /// Score `raw` against the pending trial
    pub fn submit(&mut self, raw: &str) -> Submission {
        let outcome = self.session.submit(
            raw,
            self.constraints.tonality,
            &self.universe,
            &mut self.stats,
            &mut self.rng,
        );

        let feedback = match &outcome {
            SubmitOutcome::Scored {
                correct,
                truth,
                guess,
            } => {
                let tag = self.tag();
                self.history
                    .push(tag, OutcomeRecord::new(truth.clone(), guess.clone(), *correct));
                tracing::debug!(truth = %truth, guess = %guess, correct, "answer scored");
                Some(self.feedback_report(*correct, truth, guess))
            }
            _ => None,
        };

        Submission { outcome, feedback }
    }

    /// Like [`submit`](Self::submit), expanding octave shorthand first
    pub fn submit_text(&mut self, raw: &str) -> Submission {
        self.submit(&expand_octave_notation(raw))
    }

    /// Play the current trial again; false when there is nothing to play
    pub fn replay(&mut self) -> bool {
        match self.session.replay_cue(&self.constraints, &self.config.playback) {
            Some(cue) => {
                self.sink.stop_all();
                self.sink.play(&cue);
                true
            }
            None => false,
        }
    }

    /// Play a typed guess placed against the current trial
    pub fn play_guess(&mut self, raw: &str) -> bool {
        match parse_guess(&expand_octave_notation(raw), self.constraints.tonality) {
            Some(guess) => self.play_shape(&guess),
            None => false,
        }
    }

    /// After an answer, play the guess that was submitted
    pub fn play_last_guess(&mut self) -> bool {
        if self.session.phase() != TrialPhase::Answered {
            return false;
        }
        let Some(last) = self.history.log(self.tag()).last() else {
            return false;
        };
        let guess = last.guess.clone();
        self.play_shape(&guess)
    }

    fn play_shape(&mut self, guess: &Shape) -> bool {
        match self
            .session
            .guess_cue(guess, &self.constraints, &self.config.playback)
        {
            Some(cue) => {
                self.sink.stop_all();
                self.sink.play(&cue);
                true
            }
            None => false,
        }
    }

    fn feedback_report(&self, correct: bool, truth: &Shape, guess: &Shape) -> FeedbackReport {
        let window = self.stats.window();
        FeedbackReport {
            correct,
            truth: truth.clone(),
            guess: guess.clone(),
            rolling_correct: self
                .stats
                .for_shape(&self.universe, truth)
                .map(|s| s.correct())
                .unwrap_or(0),
            window,
            minimum_correct: (self.stats.minimum_accuracy() * window as f64).round() as u32,
            overall_percent: self.history.overall_percent(self.tag()),
            aggregate: self.stats.aggregate(),
        }
    }
}

fn check_constraints(constraints: &Constraints) -> Result<()> {
    if let TonalityMode::FixedKey(pc) = constraints.tonality {
        TonalityMode::fixed(pc)?;
    }
    Ok(())
}
