//! Trial lifecycle
//!
//! One trial slot moving through `NoTrial -> Pending -> Answered -> NoTrial`.
//! A pending trial is returned unchanged until it is answered, so repeated
//! requests never re-roll the shape mid-answer.

use rand::Rng;

use crate::config::{pitch_class_name, Constraints, PlaybackConfig, TonalityMode};
use crate::guess::parse_guess;
use crate::playback::{self, PlaybackCue, ReplayStep};
use crate::selector::Selector;
use crate::shape::Shape;
use crate::stats::StatsStore;
use crate::types::{SubmitOutcome, Trial, PITCH_CLASSES};
use crate::universe::{octave_range, Universe};

/// Shapes drawn per request before giving up on an unplayable range
const MAX_DRAWS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    NoTrial,
    Pending,
    Answered,
}

/// Replay counters, reset with every new trial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayCounters {
    pub unanswered: u32,
    pub answered: u32,
    pub guess: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    current: Option<Trial>,
    replays: ReplayCounters,
    /// Key whose centre chord was last cued in fixed-key drills
    cued_key: Option<i32>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TrialPhase {
        match &self.current {
            None => TrialPhase::NoTrial,
            Some(t) if t.answered => TrialPhase::Answered,
            Some(_) => TrialPhase::Pending,
        }
    }

    pub fn current(&self) -> Option<&Trial> {
        self.current.as_ref()
    }

    pub fn replays(&self) -> ReplayCounters {
        self.replays
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drop the slot if it is answered, or pending on a shape outside `universe`
    pub fn revalidate(&mut self, universe: &Universe) {
        let stale = match &self.current {
            Some(t) => t.answered || !universe.contains(&t.shape),
            None => false,
        };
        if stale {
            self.current = None;
        }
    }

    /// Forget which key was last established, so the next fixed-key trial cues it again
    pub fn forget_cued_key(&mut self) {
        self.cued_key = None;
    }

    /// Return the pending trial, or draw and realize a new one.
    /// Shapes with no playable root are redrawn a bounded number of times.
    /// `None` means no trial is available (empty universe or no playable root).
    pub fn request_trial<R: Rng>(
        &mut self,
        universe: &Universe,
        stats: &StatsStore,
        selector: &Selector,
        constraints: &Constraints,
        playback_config: &PlaybackConfig,
        rng: &mut R,
    ) -> Option<&Trial> {
        if self.phase() == TrialPhase::Pending {
            return self.current.as_ref();
        }
        self.current = None;

        let mut realized = None;
        for _ in 0..MAX_DRAWS {
            let idx = selector.pick(universe, stats, rng)?;
            let shape = universe.get(idx)?.clone();
            match realize_root(&shape, constraints, rng) {
                Some((root, key_pc)) => {
                    realized = Some((shape, root, key_pc));
                    break;
                }
                None => tracing::debug!(shape = %shape, "no playable root, redrawing"),
            }
        }
        let Some((shape, root, key_pc)) = realized else {
            tracing::warn!(draws = MAX_DRAWS, "no playable shape in current range");
            return None;
        };

        let pitches: Vec<i32> = shape.offsets().iter().map(|o| root + o).collect();
        let gains = playback::note_gains(pitches.len(), playback_config.amp_noise, rng);

        tracing::debug!(shape = %shape, root, key = pitch_class_name(key_pc), "trial realized");

        self.replays = ReplayCounters::default();
        self.current = Some(Trial {
            shape,
            root,
            pitches,
            gains,
            key_pc,
            answered: false,
        });
        self.current.as_ref()
    }

    /// Score a raw guess against the pending trial and record it.
    pub fn submit<R: Rng>(
        &mut self,
        raw: &str,
        tonality: TonalityMode,
        universe: &Universe,
        stats: &mut StatsStore,
        rng: &mut R,
    ) -> SubmitOutcome {
        let Some(trial) = self.current.as_mut().filter(|t| !t.answered) else {
            return SubmitOutcome::NoPendingTrial;
        };

        let Some(guess) = parse_guess(raw, tonality) else {
            return SubmitOutcome::Indeterminate;
        };

        let correct = guess.key() == trial.shape.key();
        trial.answered = true;

        match universe.index_of(&trial.shape.key()) {
            Some(idx) => stats.record(idx, correct, rng),
            None => tracing::warn!(shape = %trial.shape, "answered shape missing from universe"),
        }

        SubmitOutcome::Scored {
            correct,
            truth: trial.shape.clone(),
            guess,
        }
    }

    /// Cues announcing a freshly realized trial
    pub fn intro_cues(&mut self, constraints: &Constraints, config: &PlaybackConfig) -> Vec<PlaybackCue> {
        let Some(trial) = &self.current else {
            return Vec::new();
        };
        let trial_chord = playback::chord(trial.pitches.clone(), trial.gains.clone(), config);
        let key_cue = || {
            playback::key_centre(
                trial.key_pc,
                constraints.scale,
                constraints.midi_low,
                constraints.midi_high,
                config,
            )
        };
        let lead = config.key_centre_duration + config.tonic_lead_time;

        match constraints.tonality {
            TonalityMode::Atonal => vec![trial_chord],
            TonalityMode::RandomKey => vec![
                key_cue(),
                PlaybackCue {
                    delay: lead,
                    ..trial_chord
                },
            ],
            TonalityMode::FixedKey(pc) => {
                if self.cued_key == Some(pc) {
                    vec![trial_chord]
                } else {
                    self.cued_key = Some(pc);
                    vec![
                        key_cue(),
                        PlaybackCue {
                            delay: lead,
                            ..trial_chord
                        },
                    ]
                }
            }
        }
    }

    /// Cue for replaying the current trial, advancing the replay counters
    pub fn replay_cue(&mut self, constraints: &Constraints, config: &PlaybackConfig) -> Option<PlaybackCue> {
        let trial = self.current.as_ref()?;
        let pitches = playback::playable(&trial.pitches, constraints.midi_low, constraints.midi_high);
        if pitches.is_empty() {
            return None;
        }

        let tonal = constraints.tonality.is_tonal();
        let step = if trial.answered {
            self.replays.answered += 1;
            playback::answered_replay_step(self.replays.answered, config.arpeggio_every, tonal)
        } else {
            self.replays.unanswered += 1;
            playback::unanswered_replay_step(self.replays.unanswered, config.arpeggio_every, tonal)
        };

        Some(step_cue(step, pitches, trial, constraints, config))
    }

    /// Cue for hearing a guessed shape placed against the current trial
    pub fn guess_cue(
        &mut self,
        guess: &Shape,
        constraints: &Constraints,
        config: &PlaybackConfig,
    ) -> Option<PlaybackCue> {
        let trial = self.current.as_ref()?;
        let pitches = playback::place_guess(
            guess.offsets(),
            trial.root,
            &trial.pitches,
            constraints.midi_low,
            constraints.midi_high,
        )?;

        if !trial.answered {
            return Some(playback::chord(pitches, trial.gains.clone(), config));
        }

        self.replays.guess += 1;
        let step = playback::answered_replay_step(
            self.replays.guess,
            config.arpeggio_every,
            constraints.tonality.is_tonal(),
        );
        Some(step_cue(step, pitches, trial, constraints, config))
    }
}

fn step_cue(
    step: ReplayStep,
    pitches: Vec<i32>,
    trial: &Trial,
    constraints: &Constraints,
    config: &PlaybackConfig,
) -> PlaybackCue {
    match step {
        ReplayStep::KeyCentre => playback::key_centre(
            trial.key_pc,
            constraints.scale,
            constraints.midi_low,
            constraints.midi_high,
            config,
        ),
        ReplayStep::Arpeggio => playback::arpeggio(pitches, trial.gains.clone(), config),
        ReplayStep::Chord => playback::chord(pitches, trial.gains.clone(), config),
    }
}

/// Choose a root for `shape` and the key pitch class it is heard in.
///
/// Atonal and random-key drills take any root that keeps the shape in range;
/// a fixed key takes an octave placement of the key pitch class.
pub fn realize_root<R: Rng>(shape: &Shape, constraints: &Constraints, rng: &mut R) -> Option<(i32, i32)> {
    match constraints.tonality {
        TonalityMode::Atonal | TonalityMode::RandomKey => {
            let root_low = constraints.midi_low - shape.low();
            let root_high = constraints.midi_high - shape.high();
            if root_low > root_high {
                return None;
            }
            let root = rng.gen_range(root_low..=root_high);
            Some((root, root.rem_euclid(PITCH_CLASSES)))
        }
        TonalityMode::FixedKey(key_pc) => {
            let (z_min, z_max) =
                octave_range(shape, key_pc, constraints.midi_low, constraints.midi_high)?;
            let z = rng.gen_range(z_min..=z_max);
            Some((key_pc + PITCH_CLASSES * z, key_pc))
        }
    }
}
