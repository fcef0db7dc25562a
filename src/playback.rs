//! Playback cues
//!
//! The engine never renders audio. It describes what should sound as
//! [`PlaybackCue`] values and hands them to an injected [`AudioSink`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PlaybackConfig, ScaleMode};
use crate::types::PITCH_CLASSES;

// ==================== Cues ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CueKind {
    /// All pitches together
    Chord,
    /// Pitches one after another, lowest first
    Arpeggio,
    /// Tonic chord establishing the key
    KeyCentre,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackCue {
    pub kind: CueKind,
    /// MIDI pitches, ascending
    pub pitches: Vec<i32>,
    /// Per-note gains; empty means the sink's default
    pub gains: Vec<f64>,
    /// Chord duration, or per-note duration for arpeggios (seconds)
    pub duration: f64,
    /// Offset from the call that produced the cue (seconds)
    pub delay: f64,
}

/// Capability the engine plays through
pub trait AudioSink {
    fn play(&mut self, cue: &PlaybackCue);

    fn stop_all(&mut self) {}
}

/// Sink that discards every cue
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&mut self, _cue: &PlaybackCue) {}
}

/// Sink that keeps every cue it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub cues: Vec<PlaybackCue>,
}

impl AudioSink for RecordingSink {
    fn play(&mut self, cue: &PlaybackCue) {
        self.cues.push(cue.clone());
    }

    fn stop_all(&mut self) {
        self.cues.clear();
    }
}

// ==================== Cue Builders ====================

pub fn chord(pitches: Vec<i32>, gains: Vec<f64>, config: &PlaybackConfig) -> PlaybackCue {
    PlaybackCue {
        kind: CueKind::Chord,
        pitches,
        gains,
        duration: config.chord_duration,
        delay: 0.0,
    }
}

pub fn arpeggio(pitches: Vec<i32>, gains: Vec<f64>, config: &PlaybackConfig) -> PlaybackCue {
    PlaybackCue {
        kind: CueKind::Arpeggio,
        pitches,
        gains,
        duration: config.arpeggio_note_duration,
        delay: 0.0,
    }
}

pub fn key_centre(
    key_pc: i32,
    scale: ScaleMode,
    midi_low: i32,
    midi_high: i32,
    config: &PlaybackConfig,
) -> PlaybackCue {
    PlaybackCue {
        kind: CueKind::KeyCentre,
        pitches: key_centre_chord(key_pc, scale, midi_low, midi_high),
        gains: Vec::new(),
        duration: config.key_centre_duration,
        delay: 0.0,
    }
}

/// Tonic chord near the middle of the range.
///
/// The tonic is the range midpoint raised to the key's pitch class, then
/// folded back by one octave if it left the range.
pub fn key_centre_chord(key_pc: i32, scale: ScaleMode, midi_low: i32, midi_high: i32) -> Vec<i32> {
    let mid = ((midi_low + midi_high) as f64 / 2.0).round() as i32;
    let diff = (key_pc - mid.rem_euclid(PITCH_CLASSES)).rem_euclid(PITCH_CLASSES);
    let mut tonic = mid + diff;

    if tonic < midi_low {
        tonic += PITCH_CLASSES;
    }
    if tonic > midi_high {
        tonic -= PITCH_CLASSES;
    }

    scale.tonic_chord().iter().map(|n| tonic + n).collect()
}

/// Per-note gains around 0.9 with uniform noise of amplitude `amp_noise`
pub fn note_gains<R: Rng>(count: usize, amp_noise: f64, rng: &mut R) -> Vec<f64> {
    (0..count)
        .map(|_| 0.9 + (rng.gen::<f64>() * 2.0 - 1.0) * amp_noise)
        .collect()
}

// ==================== Replay Cycle ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStep {
    KeyCentre,
    Chord,
    Arpeggio,
}

/// Step for the `count`-th replay (1-based) before the trial is answered.
/// Tonal drills re-establish the key every `every + 1` replays.
pub fn unanswered_replay_step(count: u32, every: u32, tonal: bool) -> ReplayStep {
    let every = every.max(1);
    if tonal && count % (every + 1) == 0 {
        ReplayStep::KeyCentre
    } else {
        ReplayStep::Chord
    }
}

/// Step for the `count`-th replay (1-based) after the trial is answered.
/// Atonal drills arpeggiate every `every`-th replay; tonal drills cycle
/// chord, ..., arpeggio, key centre over `every + 1` replays.
pub fn answered_replay_step(count: u32, every: u32, tonal: bool) -> ReplayStep {
    let every = every.max(1);
    if !tonal {
        return if count % every == 0 {
            ReplayStep::Arpeggio
        } else {
            ReplayStep::Chord
        };
    }

    let pos = count % (every + 1);
    if pos == 0 {
        ReplayStep::KeyCentre
    } else if pos == every {
        ReplayStep::Arpeggio
    } else {
        ReplayStep::Chord
    }
}

/// Pitches within `[midi_low, midi_high]`
pub fn playable(pitches: &[i32], midi_low: i32, midi_high: i32) -> Vec<i32> {
    pitches
        .iter()
        .copied()
        .filter(|m| *m >= midi_low && *m <= midi_high)
        .collect()
}

/// Place a guessed shape next to the trial it answers.
///
/// Tries the guess on the trial's root shifted by -12, 0 and +12, keeping the
/// placement with the most notes in range, then the one whose mean is
/// closest to the trial's mean. Returns the in-range pitches, ascending.
pub fn place_guess(
    guess: &[i32],
    root: i32,
    truth_pitches: &[i32],
    midi_low: i32,
    midi_high: i32,
) -> Option<Vec<i32>> {
    if truth_pitches.is_empty() {
        return None;
    }
    let truth_mean = truth_pitches.iter().sum::<i32>() as f64 / truth_pitches.len() as f64;

    let mut best: Option<(Vec<i32>, usize, f64)> = None;
    for k in [-1, 0, 1] {
        let shifted: Vec<i32> = guess
            .iter()
            .map(|r| root + r + PITCH_CLASSES * k)
            .collect();
        let in_range = playable(&shifted, midi_low, midi_high);
        if in_range.is_empty() {
            continue;
        }

        let count = in_range.len();
        let mean = in_range.iter().sum::<i32>() as f64 / count as f64;
        let dist = (truth_mean - mean).abs();

        let better = match &best {
            None => true,
            Some((_, best_count, best_dist)) => {
                count > *best_count || (count == *best_count && dist < *best_dist)
            }
        };
        if better {
            best = Some((in_range, count, dist));
        }
    }

    best.map(|(mut pitches, _, _)| {
        pitches.sort_unstable();
        pitches
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_key_centre_chord_near_midpoint() {
        // midpoint 60 (C4), key D -> tonic 62
        assert_eq!(
            key_centre_chord(2, ScaleMode::MajorDiatonic, 48, 72),
            vec![62, 66, 69, 74]
        );
        assert_eq!(key_centre_chord(0, ScaleMode::Root, 48, 72), vec![60]);
        assert_eq!(
            key_centre_chord(9, ScaleMode::MinorChromatic, 48, 72),
            vec![69, 72, 76, 81]
        );
    }

    #[test]
    fn test_key_centre_folds_into_range() {
        // midpoint 61, key C -> 72 would exceed 62
        assert_eq!(key_centre_chord(0, ScaleMode::Root, 60, 62), vec![60]);
    }

    #[test]
    fn test_gains_bounded() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let gains = note_gains(100, 0.3, &mut rng);
        assert_eq!(gains.len(), 100);
        assert!(gains.iter().all(|g| *g >= 0.6 && *g <= 1.2));
    }

    #[test]
    fn test_unanswered_cycle() {
        let steps: Vec<ReplayStep> = (1..=8).map(|c| unanswered_replay_step(c, 3, true)).collect();
        assert_eq!(steps[3], ReplayStep::KeyCentre);
        assert_eq!(steps[7], ReplayStep::KeyCentre);
        assert_eq!(steps[0], ReplayStep::Chord);
        assert!((1..=8).all(|c| unanswered_replay_step(c, 3, false) == ReplayStep::Chord));
    }

    #[test]
    fn test_answered_cycle_atonal() {
        let steps: Vec<ReplayStep> = (1..=6).map(|c| answered_replay_step(c, 3, false)).collect();
        assert_eq!(
            steps,
            vec![
                ReplayStep::Chord,
                ReplayStep::Chord,
                ReplayStep::Arpeggio,
                ReplayStep::Chord,
                ReplayStep::Chord,
                ReplayStep::Arpeggio,
            ]
        );
    }

    #[test]
    fn test_answered_cycle_tonal() {
        let steps: Vec<ReplayStep> = (1..=4).map(|c| answered_replay_step(c, 3, true)).collect();
        assert_eq!(
            steps,
            vec![
                ReplayStep::Chord,
                ReplayStep::Chord,
                ReplayStep::Arpeggio,
                ReplayStep::KeyCentre,
            ]
        );
    }

    #[test]
    fn test_place_guess_prefers_most_notes_then_closest() {
        // truth C major triad at 60
        let truth = [60, 64, 67];
        let placed = place_guess(&[0, 3, 7], 60, &truth, 48, 72).unwrap();
        assert_eq!(placed, vec![60, 63, 67]);

        // near the top of the range only the lower octave fits fully
        let placed = place_guess(&[0, 4, 7], 68, &[68, 72, 75], 48, 72).unwrap();
        assert_eq!(placed, vec![56, 60, 63]);
    }

    #[test]
    fn test_place_guess_out_of_range() {
        assert_eq!(place_guess(&[0, 4], 10, &[10, 14], 48, 72), None);
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::default();
        let config = PlaybackConfig::default();
        sink.play(&chord(vec![60, 64, 67], Vec::new(), &config));
        assert_eq!(sink.cues.len(), 1);
        assert_eq!(sink.cues[0].kind, CueKind::Chord);
        sink.stop_all();
        assert!(sink.cues.is_empty());
    }
}
