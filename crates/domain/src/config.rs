//! Client configuration
//!
//! [`AuthConfig`] is immutable once a client is built. It selects the issuer
//! (production, sandbox or a custom domain) and carries the values sent in the
//! authorization request.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTHORIZE_PATH, DEFAULT_HTTP_TIMEOUT_SECS, PRODUCTION_HOST, REVOKE_PATH, SANDBOX_HOST,
    TOKEN_PATH, USERINFO_PATH,
};
use crate::errors::ConfigError;

/// Value of the `prompt` authorization parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    None,
    Login,
    Consent,
    SelectAccount,
}

impl Prompt {
    /// Value sent in the `prompt` parameter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Login => "login",
            Self::Consent => "consent",
            Self::SelectAccount => "select_account",
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prompt {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            "consent" => Ok(Self::Consent),
            "select_account" => Ok(Self::SelectAccount),
            other => Err(ConfigError::invalid("prompt", format!("unknown prompt '{other}'"))),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

/// Per-client OAuth configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Connected app consumer key
    pub client_id: String,

    /// Consumer secret. Only set where the storage variant cannot keep it
    /// confidential anyway (browser storage).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Redirect target; the session launcher supplies a default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Use `test.salesforce.com` instead of `login.salesforce.com`
    #[serde(default)]
    pub sandbox: bool,

    #[serde(default)]
    pub prompt: Vec<Prompt>,

    /// Ask the browser for a session that shares no cookies with the user's
    /// regular profile
    #[serde(default)]
    pub prefer_ephemeral_session: bool,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// Base URL overriding the host chosen by `sandbox` (My Domain)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl AuthConfig {
    /// Create a production configuration with defaults for everything but
    /// the client id.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: None,
            sandbox: false,
            prompt: Vec::new(),
            prefer_ephemeral_session: false,
            scopes: Vec::new(),
            issuer_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl IntoIterator<Item = Prompt>) -> Self {
        self.prompt = prompt.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_prefer_ephemeral_session(mut self, prefer: bool) -> Self {
        self.prefer_ephemeral_session = prefer;
        self
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_issuer_url(mut self, issuer_url: impl Into<String>) -> Self {
        self.issuer_url = Some(issuer_url.into());
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Check the invariants a client relies on.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` for a blank client id and
    /// `ConfigError::Invalid` for a malformed issuer URL or zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("client_id".to_string()));
        }

        if let Some(issuer) = &self.issuer_url {
            if !(issuer.starts_with("https://") || issuer.starts_with("http://")) {
                return Err(ConfigError::invalid(
                    "issuer_url",
                    "must be an absolute http(s) URL",
                ));
            }
        }

        if let Some(redirect) = &self.redirect_uri {
            if redirect.trim().is_empty() {
                return Err(ConfigError::invalid("redirect_uri", "must not be blank"));
            }
        }

        if self.http_timeout_secs == 0 {
            return Err(ConfigError::invalid("http_timeout_secs", "must be greater than zero"));
        }

        Ok(())
    }

    /// Base URL of the issuer, without trailing slash.
    #[must_use]
    pub fn issuer_base_url(&self) -> String {
        match &self.issuer_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.sandbox => format!("https://{SANDBOX_HOST}"),
            None => format!("https://{PRODUCTION_HOST}"),
        }
    }

    /// Authorization endpoint of the resolved issuer.
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}{AUTHORIZE_PATH}", self.issuer_base_url())
    }

    /// Token endpoint of the resolved issuer.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}{TOKEN_PATH}", self.issuer_base_url())
    }

    /// Revocation endpoint of the resolved issuer.
    #[must_use]
    pub fn revocation_endpoint(&self) -> String {
        format!("{}{REVOKE_PATH}", self.issuer_base_url())
    }

    /// Userinfo endpoint of the resolved issuer.
    #[must_use]
    pub fn userinfo_endpoint(&self) -> String {
        format!("{}{USERINFO_PATH}", self.issuer_base_url())
    }

    /// Space-separated `prompt` value, `None` when no prompt is configured.
    #[must_use]
    pub fn prompt_param(&self) -> Option<String> {
        if self.prompt.is_empty() {
            return None;
        }
        Some(self.prompt.iter().map(Prompt::as_str).collect::<Vec<_>>().join(" "))
    }

    /// Space-separated `scope` value, `None` when no scope is configured.
    #[must_use]
    pub fn scope_param(&self) -> Option<String> {
        if self.scopes.is_empty() {
            return None;
        }
        Some(self.scopes.join(" "))
    }

    /// Per-request timeout for issuer calls.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("sandbox", &self.sandbox)
            .field("prompt", &self.prompt)
            .field("prefer_ephemeral_session", &self.prefer_ephemeral_session)
            .field("scopes", &self.scopes)
            .field("issuer_url", &self.issuer_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}
