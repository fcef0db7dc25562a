//! Tracing setup for hosts and the simulation binary.
//!
//! The library itself only emits events; installing a subscriber is the
//! host's call.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "drill.log";

/// Keeps the non-blocking file writer flushing until dropped
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Directory for daily log files, `LOG_DIR` or `./logs`
fn log_dir() -> PathBuf {
    std::env::var("LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./logs"))
}

/// Install a global subscriber filtered by `log_level`, an `EnvFilter`
/// directive such as `"info"` or `"pitchset_drill=debug"`.
///
/// Always writes to stdout. With `ENABLE_FILE_LOGS` set it also writes a
/// daily file, and the returned guard must outlive the program's logging.
/// If a subscriber is already installed the call changes nothing.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_sink = if file_logging_enabled() {
        let dir = log_dir();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, &dir, LOG_FILE_PREFIX);
                Some(tracing_appender::non_blocking(appender))
            }
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", dir.display());
                None
            }
        }
    } else {
        None
    };

    let (file_layer, guard) = match file_sink {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true),
            ),
            Some(FileLogGuard { _guard: guard }),
        ),
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();

    match installed {
        Ok(()) => guard,
        Err(_) => {
            tracing::debug!("tracing subscriber already installed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        let _first = init_tracing("pitchset_drill=debug");
        let second = init_tracing("not a valid directive [");
        assert!(second.is_none());
    }
}
