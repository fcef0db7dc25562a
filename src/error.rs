use thiserror::Error;

/// Errors surfaced by the engine's configuration and snapshot boundaries.
///
/// Everything inside the drill loop is recoverable without an error value:
/// an empty universe or a missing trial is reported as `None`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid pitch class: {0}")]
    InvalidPitchClass(i32),
    #[error("snapshot decode failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
