use crate::infrastructure::error::InfraError;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub const LOG_ENV_VAR: &str = "FOCUSFLOW_LOG";
pub const LOG_FILE_PREFIX: &str = "focusflow.log";

/// Flushes buffered log lines when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

pub fn parse_level(level: &str) -> Result<LevelFilter, InfraError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown log level '{level}'")))
}

pub fn init_logging(level: &str, log_dir: &Path) -> Result<LoggingGuard, InfraError> {
    let default_level = parse_level(level)?;
    fs::create_dir_all(log_dir)?;

    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_current_span(true);

    Registry::default()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|error| InfraError::Logging(format!("logging already initialized: {error}")))?;

    tracing::info!(log_dir = %log_dir.display(), level = %default_level, "logging initialized");
    Ok(LoggingGuard { _guard: guard })
}
