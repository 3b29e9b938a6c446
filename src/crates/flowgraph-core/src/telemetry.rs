//! Tracing subscriber setup
//!
//! Library code only emits `tracing` events. Applications that want them printed
//! call [`init_tracing`] once at startup with the `[logging]` section of their
//! [`EngineConfig`](crate::EngineConfig). `RUST_LOG`, when set, wins over the
//! configured level.

use crate::config::LoggingConfig;
use crate::error::{Result, WorkflowError};
use tracing_subscriber::EnvFilter;

/// Filter built from `RUST_LOG`, falling back to `config.level`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| WorkflowError::configuration(format!("Invalid log filter: {}", e)))
}

/// Install a global `fmt` subscriber described by `config`
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_ansi(config.colored)
        .with_target(true);

    let installed = match (config.format.as_str(), config.timestamps) {
        ("pretty", true) => builder.pretty().try_init(),
        ("pretty", false) => builder.pretty().without_time().try_init(),
        ("compact", true) => builder.compact().try_init(),
        ("compact", false) => builder.compact().without_time().try_init(),
        (other, _) => {
            return Err(WorkflowError::configuration(format!(
                "Unknown log format: {}",
                other
            )))
        }
    };

    installed.map_err(|e| WorkflowError::configuration(format!("Failed to install tracing: {}", e)))
}
