//! Logging setup.
//!
//! The terminal belongs to the UI, so logs go to a file. The filter comes
//! from `CASTFRAME_LOG` when set, otherwise from `[logging] level`.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "CASTFRAME_LOG";

pub fn default_log_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("castframe")
        .join("castframe.log")
}

pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if !directives.is_empty() {
            return EnvFilter::try_new(&directives)
                .with_context(|| format!("Invalid {} filter '{}'", LOG_ENV, directives));
        }
    }
    EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))
}

/// Install the global subscriber. Returns the log file path.
pub fn init_logging(config: &LoggingConfig) -> Result<PathBuf> {
    let filter = build_env_filter(config)?;
    let path = config.file.clone().unwrap_or_else(default_log_file);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}
