//! Error types used throughout forceauth

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failures raised by the authentication core.
///
/// Every fallible client operation fails with exactly one of these kinds.
/// The kind is stable (see [`AuthError::code`]); the message is for humans.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "snake_case")]
pub enum AuthError {
    /// The browser step did not complete (cancelled, dismissed, errored) or
    /// could not start.
    #[error("Authorization session failed: {0}")]
    AuthSessionFailed(String),

    /// The redirect carried no code, or its state did not match the attempt.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No access token is stored.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Userinfo request failed: {0}")]
    UserInfoRequestFailed(String),

    /// The token store could not be read or written.
    #[error("Token storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl AuthError {
    /// Stable snake_case identifier of the failure kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthSessionFailed(_) => "auth_session_failed",
            Self::InvalidState(_) => "invalid_state",
            Self::NotAuthenticated(_) => "not_authenticated",
            Self::TokenExchangeFailed(_) => "token_exchange_failed",
            Self::UserInfoRequestFailed(_) => "userinfo_request_failed",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    /// Human-readable detail carried by the variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::AuthSessionFailed(msg)
            | Self::InvalidState(msg)
            | Self::NotAuthenticated(msg)
            | Self::TokenExchangeFailed(msg)
            | Self::UserInfoRequestFailed(msg)
            | Self::StorageUnavailable(msg) => msg,
        }
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(String),

    /// The HTTP client could not be built from the configuration
    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for errors.
    use super::*;

    #[test]
    fn codes_are_stable_snake_case() {
        let cases = [
            (AuthError::AuthSessionFailed(String::new()), "auth_session_failed"),
            (AuthError::InvalidState(String::new()), "invalid_state"),
            (AuthError::NotAuthenticated(String::new()), "not_authenticated"),
            (AuthError::TokenExchangeFailed(String::new()), "token_exchange_failed"),
            (AuthError::UserInfoRequestFailed(String::new()), "userinfo_request_failed"),
            (AuthError::StorageUnavailable(String::new()), "storage_unavailable"),
        ];

        for (error, code) in cases {
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn serializes_code_and_message() {
        let error = AuthError::InvalidState("state mismatch".to_string());
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json["code"], "invalid_state");
        assert_eq!(json["message"], "state mismatch");

        let back: AuthError = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn display_includes_message() {
        let error = AuthError::TokenExchangeFailed("invalid_grant".to_string());
        assert_eq!(error.to_string(), "Token exchange failed: invalid_grant");
        assert_eq!(error.message(), "invalid_grant");
    }
}
