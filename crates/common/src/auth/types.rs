//! OAuth 2.0 types and structures
//!
//! Wire types for the token endpoint, the redirect-session boundary, and the
//! client state published to observers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// OAuth token response from the authorization server
///
/// Salesforce returns more than RFC 6749 requires; only `access_token` is
/// mandatory here.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Org instance the token is valid for, e.g. `https://acme.my.salesforce.com`
    #[serde(default)]
    pub instance_url: Option<String>,
    /// Identity URL of the signed-in user
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("instance_url", &self.instance_url)
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// OAuth error response from authorization server
///
/// Standard OAuth 2.0 error response format (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Request handed to the browser-session launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSessionRequest {
    /// Full authorization URL to open
    pub url: String,
    /// Redirect the session waits for
    pub redirect_uri: String,
    pub prefer_ephemeral_session: bool,
}

/// How a browser session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSessionResult {
    /// The issuer redirected back; `url` is the full redirect URL.
    Success { url: String },
    /// The user cancelled.
    Cancel,
    /// The session was closed without a result.
    Dismiss,
    Error(String),
}

impl AuthSessionResult {
    /// Short outcome label for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Cancel => "cancel",
            Self::Dismiss => "dismiss",
            Self::Error(_) => "error",
        }
    }
}

/// Lifecycle of an [`AuthClient`](super::AuthClient)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Idle,
    AwaitingRedirect,
    Exchanging,
    Authenticated,
    Failed,
}

/// Snapshot published to status observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Storage has been read at least once
    pub is_initialized: bool,
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::types.
    use super::*;

    #[test]
    fn test_token_response_minimal() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"AT1"}"#).unwrap();
        assert_eq!(response.access_token, "AT1");
        assert!(response.refresh_token.is_none());
    }

    /// Validates `TokenResponse` deserialization for a Salesforce payload.
    ///
    /// Assertions:
    /// - Confirms Salesforce-specific fields are captured.
    /// - Ensures `Debug` output never contains token values.
    #[test]
    fn test_token_response_salesforce_payload() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "00Dxx!AQ0AQ",
            "refresh_token": "5Aep861",
            "signature": "abc",
            "scope": "refresh_token api",
            "instance_url": "https://acme.my.salesforce.com",
            "id": "https://login.salesforce.com/id/00Dxx/005xx",
            "token_type": "Bearer",
            "issued_at": "1700000000000"
        }))
        .unwrap();

        assert_eq!(response.refresh_token.as_deref(), Some("5Aep861"));
        assert_eq!(response.instance_url.as_deref(), Some("https://acme.my.salesforce.com"));

        let debug = format!("{response:?}");
        assert!(!debug.contains("00Dxx!AQ0AQ"));
        assert!(!debug.contains("5Aep861"));
    }

    #[test]
    fn test_oauth_error_display() {
        let err: OAuthError = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"expired authorization code"}"#,
        )
        .unwrap();
        assert_eq!(err.to_string(), "invalid_grant: expired authorization code");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(AuthState::default(), AuthState::Idle);
        assert_eq!(AuthStatus::default(), AuthStatus { is_initialized: false, is_authenticated: false });
        assert_eq!(AuthSessionResult::Dismiss.kind(), "dismiss");
    }
}
