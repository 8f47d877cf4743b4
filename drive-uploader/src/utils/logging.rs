//! Process logging: a debug-level log file plus an info-level console stream.
//!
//! The subscriber is installed as the scoped default for as long as the
//! returned [`LoggingGuard`] lives, so `main` owns the logging lifecycle.

use crate::utils::error::Result;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILE: &str = "image-upload.log";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_file: PathBuf,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            file_level: LevelFilter::DEBUG,
            console_level: LevelFilter::INFO,
        }
    }
}

impl LoggingConfig {
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }
}

/// Keeps the subscriber installed; dropping it detaches logging.
pub struct LoggingGuard {
    log_file: PathBuf,
    _default: DefaultGuard,
}

impl LoggingGuard {
    pub fn log_file(&self) -> &PathBuf {
        &self.log_file
    }
}

pub fn init(config: LoggingConfig) -> Result<LoggingGuard> {
    // The log file is truncated on every start
    let file = Arc::new(File::create(&config.log_file)?);

    let console_filter = EnvFilter::builder()
        .with_default_directive(config.console_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file)
                .with_filter(config.file_level),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        );

    let default = tracing::subscriber::set_default(subscriber);
    tracing::debug!("Logging to {}", config.log_file.display());

    Ok(LoggingGuard {
        log_file: config.log_file,
        _default: default,
    })
}
