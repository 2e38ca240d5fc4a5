//! Global `tracing` subscriber setup.

use edge_core::{LogConfig, LogFormat};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },

    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Parse a filter directive such as `info` or `edge_render=trace,warn`.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Filter from `RUST_LOG`, falling back to the configured level.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => parse_filter(&config.level),
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if a subscriber is already installed for the process.
pub fn init_tracing(config: &LogConfig) -> Result<(), LoggingError> {
    let registry = tracing_subscriber::registry().with(build_filter(config)?);

    let result = match config.format {
        LogFormat::Human => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true))
            .try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;
    tracing::debug!(level = %config.level, format = %config.format, "tracing initialized");
    Ok(())
}
