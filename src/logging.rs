//! Tracing setup for the binary and for embedders that want the default
//! console and file output.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Result, VisflowError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file prefix inside `LoggingConfig::file`
pub const LOG_FILE_PREFIX: &str = "visflow.log";

/// Parses `EnvFilter` directives.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| VisflowError::Logging(format!("Invalid log filter '{}': {}", directives, e)))
}

/// Installs the global subscriber.
///
/// `RUST_LOG` overrides `config.filter`. When `config.file` is set, logs are
/// also written to a daily-rolling file in that directory; keep the returned
/// guard alive until shutdown so buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.filter)?,
    };

    let console = match config.format {
        LogFormat::Pretty => fmt::layer().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    };

    let (file, guard) = match &config.file {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                VisflowError::Logging(format!("Failed to create log directory {:?}: {}", dir, e))
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| VisflowError::Logging(format!("Failed to install subscriber: {}", e)))?;

    Ok(guard)
}
