//! Engine configuration and drill constraints
//!
//! `EngineConfig` carries the tuning constants (window, aim, sampling) and
//! `Constraints` carries the learner-facing settings that define the universe.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{
    DEFAULT_AIM, DEFAULT_FOCUS_RATIO, DEFAULT_REFRESH_EVERY, DEFAULT_SAMPLE_LIMIT,
    DEFAULT_SAMPLE_SIZE, DEFAULT_WINDOW, MAX_CARDINALITY, MIDI_ABS_HIGH, MIDI_ABS_LOW,
    PITCH_CLASSES,
};

// ==================== Tonality ====================

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// How shapes relate to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TonalityMode {
    /// Untransposed shapes, any root
    Atonal,
    /// Transposed shapes heard against one fixed key pitch class
    FixedKey(i32),
    /// Transposed shapes, key chosen per trial
    RandomKey,
}

impl TonalityMode {
    /// Parse a key selector: `"atonal"`, `"random"` or a note name such as `"F#"`
    pub fn from_key_select(select: &str) -> Result<Self> {
        match select.trim() {
            "atonal" => Ok(TonalityMode::Atonal),
            "random" => Ok(TonalityMode::RandomKey),
            name => pitch_class_from_name(name)
                .map(TonalityMode::FixedKey)
                .ok_or_else(|| EngineError::InvalidConfig(format!("unknown key '{}'", name))),
        }
    }

    pub fn fixed(pc: i32) -> Result<Self> {
        if (0..PITCH_CLASSES).contains(&pc) {
            Ok(TonalityMode::FixedKey(pc))
        } else {
            Err(EngineError::InvalidPitchClass(pc))
        }
    }

    pub fn is_tonal(&self) -> bool {
        !matches!(self, TonalityMode::Atonal)
    }
}

pub fn pitch_class_from_name(name: &str) -> Option<i32> {
    NOTE_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|idx| idx as i32)
}

pub fn pitch_class_name(pc: i32) -> &'static str {
    NOTE_NAMES[pc.rem_euclid(PITCH_CLASSES) as usize]
}

/// Scale flavour used by the tonal modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    Root,
    MajorDiatonic,
    MinorDiatonic,
    MajorChromatic,
    MinorChromatic,
}

const CHROMATIC: [i32; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];
const MAJOR_DIATONIC: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_DIATONIC: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];

impl ScaleMode {
    pub const ALL: [ScaleMode; 5] = [
        ScaleMode::Root,
        ScaleMode::MajorDiatonic,
        ScaleMode::MinorDiatonic,
        ScaleMode::MajorChromatic,
        ScaleMode::MinorChromatic,
    ];

    /// Parse the short labels shown in the settings menu
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scale| scale.label() == label)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScaleMode::Root => "root",
            ScaleMode::MajorDiatonic => "M. dia.",
            ScaleMode::MinorDiatonic => "m. dia.",
            ScaleMode::MajorChromatic => "M. chr.",
            ScaleMode::MinorChromatic => "m. chr.",
        }
    }

    /// Pitch classes a transposed shape may use
    pub fn allowed_pitch_classes(&self) -> &'static [i32] {
        match self {
            ScaleMode::MajorDiatonic => &MAJOR_DIATONIC,
            ScaleMode::MinorDiatonic => &MINOR_DIATONIC,
            ScaleMode::Root | ScaleMode::MajorChromatic | ScaleMode::MinorChromatic => &CHROMATIC,
        }
    }

    pub fn restricts_pitch_classes(&self) -> bool {
        self.allowed_pitch_classes().len() != PITCH_CLASSES as usize
    }

    /// Offsets of the key-centre chord above the tonic
    pub fn tonic_chord(&self) -> &'static [i32] {
        match self {
            ScaleMode::Root => &[0],
            ScaleMode::MajorDiatonic | ScaleMode::MajorChromatic => &[0, 4, 7, 12],
            ScaleMode::MinorDiatonic | ScaleMode::MinorChromatic => &[0, 3, 7, 12],
        }
    }
}

// ==================== Constraints ====================

/// Learner-facing settings that define the shape universe.
/// Fields missing from a stored snapshot take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Inclusive (min, max) number of notes
    pub cardinality: (usize, usize),
    /// Inclusive (min, max) distance from lowest to highest note
    pub span: (i32, i32),
    pub midi_low: i32,
    pub midi_high: i32,
    pub tonality: TonalityMode,
    pub scale: ScaleMode,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            cardinality: (3, 3),
            span: (0, 12),
            midi_low: 48,
            midi_high: 72,
            tonality: TonalityMode::Atonal,
            scale: ScaleMode::Root,
        }
    }
}

impl Constraints {
    /// Scale restriction in effect (atonal drills ignore the scale)
    pub fn effective_scale(&self) -> ScaleMode {
        if self.tonality.is_tonal() {
            self.scale
        } else {
            ScaleMode::Root
        }
    }

    /// Option ranges the settings menu offers given the current values
    pub fn option_ranges(&self) -> SettingRanges {
        let min_card = if self.tonality.is_tonal() { 1 } else { 2 };
        let span_max = self.span.1;

        SettingRanges {
            cardinality_min: (min_card, MAX_CARDINALITY.min(self.cardinality.1)),
            cardinality_max: (
                min_card.max(self.cardinality.0),
                MAX_CARDINALITY.min((span_max + 1).max(0) as usize),
            ),
            span_max: (
                (self.cardinality.1 as i32 - 1).max(0),
                self.midi_high - self.midi_low,
            ),
            span_min: (0, span_max),
            midi_low: (MIDI_ABS_LOW, self.midi_high - span_max),
            midi_high: (self.midi_low + span_max, MIDI_ABS_HIGH),
        }
    }
}

/// Inclusive option ranges for each setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRanges {
    pub cardinality_min: (usize, usize),
    pub cardinality_max: (usize, usize),
    pub span_max: (i32, i32),
    pub span_min: (i32, i32),
    pub midi_low: (i32, i32),
    pub midi_high: (i32, i32),
}

// ==================== Engine Config ====================

/// Timing and dynamics handed to the audio sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Chord duration (seconds)
    pub chord_duration: f64,
    /// Key-centre chord duration (seconds)
    pub key_centre_duration: f64,
    /// Silence between the key-centre chord and the trial chord (seconds)
    pub tonic_lead_time: f64,
    /// Every n-th answered replay is arpeggiated
    pub arpeggio_every: u32,
    /// Arpeggio note duration (seconds)
    pub arpeggio_note_duration: f64,
    /// Per-note gain noise amplitude
    pub amp_noise: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chord_duration: 2.5,
            key_centre_duration: 1.5,
            tonic_lead_time: 0.45,
            arpeggio_every: 3,
            arpeggio_note_duration: 0.6,
            amp_noise: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rolling window size (W)
    pub window: usize,
    /// Accuracy fraction counted as mastered
    pub aim: f64,
    /// Probability of mastery-weighted selection
    pub focus_ratio: f64,
    /// Largest universe counted exactly
    pub sample_limit: usize,
    /// Samples per sampled estimate
    pub sample_size: usize,
    /// Answers between sampled refreshes
    pub refresh_every: u64,
    /// Fixed RNG seed for reproducible sessions
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            aim: DEFAULT_AIM,
            focus_ratio: DEFAULT_FOCUS_RATIO,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            sample_size: DEFAULT_SAMPLE_SIZE,
            refresh_every: DEFAULT_REFRESH_EVERY,
            seed: None,
            playback: PlaybackConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DRILL_WINDOW") {
            config.window = val.parse().unwrap_or(DEFAULT_WINDOW);
        }
        if let Ok(val) = std::env::var("DRILL_AIM") {
            config.aim = val.parse().unwrap_or(DEFAULT_AIM);
        }
        if let Ok(val) = std::env::var("DRILL_FOCUS_RATIO") {
            config.focus_ratio = val.parse().unwrap_or(DEFAULT_FOCUS_RATIO);
        }
        if let Ok(val) = std::env::var("DRILL_SAMPLE_LIMIT") {
            config.sample_limit = val.parse().unwrap_or(DEFAULT_SAMPLE_LIMIT);
        }
        if let Ok(val) = std::env::var("DRILL_SAMPLE_SIZE") {
            config.sample_size = val.parse().unwrap_or(DEFAULT_SAMPLE_SIZE);
        }
        if let Ok(val) = std::env::var("DRILL_REFRESH_EVERY") {
            config.refresh_every = val.parse().unwrap_or(DEFAULT_REFRESH_EVERY);
        }
        if let Ok(val) = std::env::var("DRILL_SEED") {
            config.seed = val.parse().ok();
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(EngineError::InvalidConfig("window must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.aim) {
            return Err(EngineError::InvalidConfig(format!(
                "aim {} outside [0, 1]",
                self.aim
            )));
        }
        if !(0.0..=1.0).contains(&self.focus_ratio) {
            return Err(EngineError::InvalidConfig(format!(
                "focus_ratio {} outside [0, 1]",
                self.focus_ratio
            )));
        }
        if self.sample_size == 0 {
            return Err(EngineError::InvalidConfig("sample_size must be positive".into()));
        }
        if self.refresh_every == 0 {
            return Err(EngineError::InvalidConfig("refresh_every must be positive".into()));
        }
        Ok(())
    }
}
