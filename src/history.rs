//! Outcome history
//!
//! Answered trials are appended to one log per tonality setting. The
//! `HistoryBook` is what a host persists between sessions; statistics are
//! always rebuilt from it by reconciliation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{Constraints, ScaleMode, TonalityMode};
use crate::error::Result;
use crate::types::OutcomeRecord;

const ATONAL_TAG: &str = "ATONAL";

// ==================== Log Tags ====================

/// Bucket an outcome is logged under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogTag {
    Atonal,
    Scale(ScaleMode),
}

impl LogTag {
    pub fn for_settings(constraints: &Constraints) -> Self {
        match constraints.tonality {
            TonalityMode::Atonal => LogTag::Atonal,
            _ => LogTag::Scale(constraints.scale),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::Atonal => ATONAL_TAG,
            LogTag::Scale(scale) => scale.label(),
        }
    }
}

impl TryFrom<String> for LogTag {
    type Error = String;

    fn try_from(tag: String) -> std::result::Result<Self, Self::Error> {
        if tag == ATONAL_TAG {
            return Ok(LogTag::Atonal);
        }
        ScaleMode::from_label(&tag)
            .map(LogTag::Scale)
            .ok_or_else(|| format!("unknown log bucket {tag:?}"))
    }
}

impl From<LogTag> for String {
    fn from(tag: LogTag) -> Self {
        tag.as_str().to_string()
    }
}

// ==================== History Book ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryBook {
    logs: BTreeMap<LogTag, Vec<OutcomeRecord>>,
}

impl HistoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: LogTag, record: OutcomeRecord) {
        self.logs.entry(tag).or_default().push(record);
    }

    /// Entries logged under exactly `tag`, oldest first
    pub fn log(&self, tag: LogTag) -> &[OutcomeRecord] {
        self.logs.get(&tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries replayed when reconciling under `tag`, oldest first.
    ///
    /// Chromatic drills also learn from their diatonic counterpart, whose
    /// shapes are a subset, so its entries come first.
    pub fn replay_log(&self, tag: LogTag) -> Vec<OutcomeRecord> {
        let diatonic = match tag {
            LogTag::Scale(ScaleMode::MajorChromatic) => Some(ScaleMode::MajorDiatonic),
            LogTag::Scale(ScaleMode::MinorChromatic) => Some(ScaleMode::MinorDiatonic),
            _ => None,
        };

        let mut entries = Vec::new();
        if let Some(scale) = diatonic {
            entries.extend_from_slice(self.log(LogTag::Scale(scale)));
        }
        entries.extend_from_slice(self.log(tag));
        entries
    }

    /// Rounded percentage of correct answers in `replay_log(tag)`, 0 when empty
    pub fn overall_percent(&self, tag: LogTag) -> u32 {
        let entries = self.replay_log(tag);
        if entries.is_empty() {
            return 0;
        }
        let ok = entries.iter().filter(|e| e.correct).count();
        (ok as f64 / entries.len() as f64 * 100.0).round() as u32
    }

    /// Total number of logged outcomes across all tags
    pub fn total(&self) -> usize {
        self.logs.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ==================== Snapshot ====================

/// Everything a host stores for one learner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSnapshot")]
pub struct TrainerSnapshot {
    pub settings: Constraints,
    pub logs: HistoryBook,
}

/// On-disk shape, including the flat `log` array written before bucketing
#[derive(Deserialize)]
struct StoredSnapshot {
    #[serde(default)]
    settings: Constraints,
    logs: Option<HistoryBook>,
    log: Option<Vec<OutcomeRecord>>,
}

impl From<StoredSnapshot> for TrainerSnapshot {
    fn from(stored: StoredSnapshot) -> Self {
        let logs = match (stored.logs, stored.log) {
            (Some(logs), _) => logs,
            (None, legacy) => {
                let mut book = HistoryBook::new();
                book.logs.insert(LogTag::Atonal, legacy.unwrap_or_default());
                book
            }
        };
        Self {
            settings: stored.settings,
            logs,
        }
    }
}

impl TrainerSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
