//! File-based tracing setup.
//!
//! Terminal output belongs to the front-end, so log events go to
//! `$RECIPEBOX_HOME/logs/recipebox.log` instead of stderr.

use std::fs;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, paths};

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "RECIPEBOX_LOG";

const LOG_FILE: &str = "recipebox.log";

/// Installs the global subscriber.
///
/// The returned guard flushes buffered log lines on drop and must be kept
/// alive for the lifetime of the process.
///
/// # Errors
/// Returns an error if the log directory cannot be created, the filter is
/// invalid, or a global subscriber is already installed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    let dir = paths::logs_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let filter = resolve_filter(config)?;
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!(e))
        .context("install tracing subscriber")?;

    Ok(guard)
}

fn resolve_filter(config: &Config) -> Result<EnvFilter> {
    if let Ok(directive) = std::env::var(LOG_ENV)
        && !directive.trim().is_empty()
    {
        return EnvFilter::try_new(directive.trim())
            .with_context(|| format!("Invalid {LOG_ENV} filter"));
    }

    EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("Invalid log_filter '{}'", config.log_filter))
}
