// Tracing log adapter - Subscriber setup for structured logging

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::domain::errors::*;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, DomainError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| DomainError::Config(format!("Invalid log level '{}': {}", config.level, e)))
}

/// Install the global subscriber; logs go to stderr so stdout stays machine-readable.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<bool, DomainError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    Ok(installed)
}
