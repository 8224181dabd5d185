//! Tracing initialisation
//!
//! Installs a global `tracing-subscriber` fmt layer filtered by `RUST_LOG`
//! (default `info`). Token values never reach the logs: every type holding
//! one redacts it in its `Debug` output.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line records
    #[default]
    Pretty,
    /// One JSON object per record
    Json,
}

/// Error type for tracing setup
#[derive(Error, Debug)]
pub enum ObservabilityError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Global tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `ObservabilityError` when `RUST_LOG` cannot be parsed or a
/// global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), ObservabilityError> {
    let filter = env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| ObservabilityError::AlreadyInstalled(e.to_string()))?;
    tracing::debug!(?format, "Tracing initialised");
    Ok(())
}

fn env_filter() -> Result<EnvFilter, ObservabilityError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(raw) if !raw.trim().is_empty() => parse_filter(&raw),
        _ => parse_filter(DEFAULT_FILTER),
    }
}

fn parse_filter(raw: &str) -> Result<EnvFilter, ObservabilityError> {
    EnvFilter::try_new(raw).map_err(|e| ObservabilityError::InvalidFilter {
        filter: raw.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    //! Unit tests for observability.
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("forceauth_common=debug,reqwest=warn").is_ok());
        assert!(matches!(
            parse_filter("forceauth_common=verbose"),
            Err(ObservabilityError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_second_install_rejected() {
        let first = init_tracing(LogFormat::Json);
        let second = init_tracing(LogFormat::Pretty);

        // Another test binary thread may have installed one first
        assert!(first.is_ok() || matches!(first, Err(ObservabilityError::AlreadyInstalled(_))));
        assert!(matches!(second, Err(ObservabilityError::AlreadyInstalled(_))));
    }
}
