//! Structured Logger
//!
//! Console output plus an optional daily-rolling NDJSON file, with the level
//! taken from `RUST_LOG` and falling back to the configured one.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the file writer flushing; hold it for the lifetime of the process.
pub struct LoggerGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the global subscriber.
///
/// With `log_dir` set, events are also written as JSON lines to
/// `<log_dir>/clawkeeper.log.YYYY-MM-DD`.
pub fn init_logger(log_dir: Option<&Path>, level: &str) -> Result<LoggerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level: {level}"))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "clawkeeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests, embedding); keep it.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    Ok(LoggerGuard { _file: guard })
}
