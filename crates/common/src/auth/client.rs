//! Sign-in orchestration
//!
//! [`AuthClient`] drives the Authorization Code + PKCE flow:
//!
//! ```text
//! Idle ──sign_in──► AwaitingRedirect ──redirect──► Exchanging ──► Authenticated
//!                         │                            │
//!                         └──────────► Failed ◄────────┘
//! ```
//!
//! Only one sign-in or sign-out runs at a time per client. A second
//! `sign_in` while one is in flight is rejected; `sign_out` waits its turn.

use std::sync::Arc;

use forceauth_domain::{AuthConfig, AuthError, ConfigError, Result, StorageKey, UserInfo};
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};
use url::Url;

use super::gateway::OAuthGateway;
use super::pkce::{validate_state, PkceChallenge};
use super::traits::{AuthSessionLauncher, TokenGateway};
use super::types::{AuthSessionRequest, AuthSessionResult, AuthState, AuthStatus};
use crate::error::ErrorClassification;
use crate::storage::DynTokenStore;

/// Attempts at removing the sign-in nonce once a sign-in ends
const SESSION_CLEANUP_ATTEMPTS: u32 = 3;

/// Build the authorization request URL for one attempt.
///
/// Parameters are percent-encoded; `prompt` and `scope` are only added when
/// configured.
#[must_use]
pub fn build_authorization_url(
    config: &AuthConfig,
    challenge: &PkceChallenge,
    redirect_uri: &str,
) -> String {
    let mut params = vec![
        ("client_id", config.client_id.clone()),
        ("response_type", "code".to_string()),
        ("redirect_uri", redirect_uri.to_string()),
        ("state", challenge.state.clone()),
        ("code_challenge", challenge.code_challenge.clone()),
        ("code_challenge_method", challenge.challenge_method().to_string()),
    ];

    if let Some(prompt) = config.prompt_param() {
        params.push(("prompt", prompt));
    }
    if let Some(scope) = config.scope_param() {
        params.push(("scope", scope));
    }

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorization_endpoint(), query_string)
}

/// Extract `(code, state)` from the redirect URL.
fn parse_redirect(redirect_url: &str) -> Result<(String, String)> {
    let url = Url::parse(redirect_url)
        .map_err(|e| AuthError::InvalidState(format!("malformed redirect URL: {e}")))?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(code) = code.filter(|c| !c.is_empty()) else {
        let reason = match error {
            Some(error) => format!("redirect carried no authorization code ({error})"),
            None => "redirect carried no authorization code".to_string(),
        };
        return Err(AuthError::InvalidState(reason));
    };

    let state = state.ok_or_else(|| AuthError::InvalidState("redirect carried no state".into()))?;

    Ok((code, state))
}

/// OAuth client for a single connected app
///
/// Holds no tokens in memory; the token store is the source of truth.
pub struct AuthClient {
    config: AuthConfig,
    store: DynTokenStore,
    gateway: Arc<dyn TokenGateway>,
    launcher: Arc<dyn AuthSessionLauncher>,
    operation: AsyncMutex<()>,
    state: Mutex<AuthState>,
    status: watch::Sender<AuthStatus>,
}

impl AuthClient {
    /// Create a client talking to the configured issuer over HTTPS.
    ///
    /// # Errors
    /// Returns `ConfigError` when the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn new(
        config: AuthConfig,
        store: DynTokenStore,
        launcher: Arc<dyn AuthSessionLauncher>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let gateway = Arc::new(OAuthGateway::new(config.clone(), store.clone())?);
        Self::with_gateway(config, store, launcher, gateway)
    }

    /// Create a client with a custom gateway.
    ///
    /// # Errors
    /// Returns `ConfigError` when the configuration is invalid.
    pub fn with_gateway(
        config: AuthConfig,
        store: DynTokenStore,
        launcher: Arc<dyn AuthSessionLauncher>,
        gateway: Arc<dyn TokenGateway>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let (status, _) = watch::channel(AuthStatus::default());

        Ok(Self {
            config,
            store,
            gateway,
            launcher,
            operation: AsyncMutex::new(()),
            state: Mutex::new(AuthState::Idle),
            status,
        })
    }

    /// Configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Current step of the sign-in state machine.
    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state.lock()
    }

    /// Observe `is_initialized` / `is_authenticated` changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    /// Current published status.
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    /// Read storage once and publish the initial status.
    ///
    /// # Errors
    /// Returns `AuthError::StorageUnavailable` when the store cannot be read.
    pub async fn initialize(&self) -> Result<AuthStatus> {
        let authenticated = self.is_authenticated().await?;
        if authenticated {
            self.set_state(AuthState::Authenticated);
        }

        let status = AuthStatus { is_initialized: true, is_authenticated: authenticated };
        self.status.send_replace(status);

        info!(client_id = %self.config.client_id, authenticated, "Auth client initialized");
        Ok(status)
    }

    /// Whether an access token is stored. No network call.
    ///
    /// # Errors
    /// Returns `AuthError::StorageUnavailable` when the store cannot be read.
    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.store.get(StorageKey::AccessToken).await?.is_some())
    }

    /// The stored access token.
    ///
    /// # Errors
    /// Returns `AuthError::NotAuthenticated` when none is stored.
    pub async fn access_token(&self) -> Result<String> {
        self.store
            .get(StorageKey::AccessToken)
            .await?
            .ok_or_else(|| AuthError::NotAuthenticated("no access token stored".into()))
    }

    /// Run the browser sign-in flow and persist the resulting tokens.
    ///
    /// # Errors
    /// - `AuthSessionFailed`: another operation is in flight, or the browser
    ///   step was cancelled, dismissed or failed
    /// - `InvalidState`: the redirect had no code or a foreign state
    /// - `TokenExchangeFailed`: the token endpoint rejected the code
    /// - `StorageUnavailable`: the store could not be written
    pub async fn sign_in(&self) -> Result<()> {
        let Ok(_guard) = self.operation.try_lock() else {
            debug!(client_id = %self.config.client_id, "Rejected overlapping sign-in");
            return Err(AuthError::AuthSessionFailed("sign-in already in progress".into()));
        };

        info!(client_id = %self.config.client_id, "Starting sign-in");

        let result = self.run_sign_in().await;

        self.clear_sign_in_session().await;

        match &result {
            Ok(()) => {
                self.set_state(AuthState::Authenticated);
                info!(client_id = %self.config.client_id, "Sign-in completed");
            }
            Err(e) => {
                self.set_state(AuthState::Failed);
                warn!(client_id = %self.config.client_id, code = e.code(), error = %e, "Sign-in failed");
            }
        }

        self.publish_status().await;
        result
    }

    async fn run_sign_in(&self) -> Result<()> {
        let challenge = PkceChallenge::generate();
        self.store.set(StorageKey::SignInSession, &challenge.state).await?;

        let redirect_uri = self
            .config
            .redirect_uri
            .clone()
            .unwrap_or_else(|| self.launcher.default_redirect_uri());
        let url = build_authorization_url(&self.config, &challenge, &redirect_uri);

        self.set_state(AuthState::AwaitingRedirect);
        let outcome = self
            .launcher
            .open(AuthSessionRequest {
                url,
                redirect_uri: redirect_uri.clone(),
                prefer_ephemeral_session: self.config.prefer_ephemeral_session,
            })
            .await?;

        debug!(client_id = %self.config.client_id, outcome = outcome.kind(), "Authorization session ended");

        let redirect_url = match outcome {
            AuthSessionResult::Success { url } => url,
            AuthSessionResult::Cancel => {
                return Err(AuthError::AuthSessionFailed("authorization cancelled by user".into()))
            }
            AuthSessionResult::Dismiss => {
                return Err(AuthError::AuthSessionFailed("authorization session dismissed".into()))
            }
            AuthSessionResult::Error(reason) => {
                return Err(AuthError::AuthSessionFailed(format!("authorization failed: {reason}")))
            }
        };

        let (code, returned_state) = parse_redirect(&redirect_url)?;
        if !validate_state(&challenge.state, &returned_state) {
            return Err(AuthError::InvalidState("state mismatch".into()));
        }

        self.set_state(AuthState::Exchanging);
        self.gateway
            .exchange(&code, &challenge.code_verifier, &redirect_uri)
            .await
            .map_err(|e| e.into_auth_error(AuthError::TokenExchangeFailed))?;

        Ok(())
    }

    /// Revoke the stored access token and clear local tokens.
    ///
    /// Revocation is best-effort: a failure is logged and local state is
    /// cleared anyway. Without a stored token no request is made.
    ///
    /// # Errors
    /// Returns `AuthError::StorageUnavailable` when the store cannot be read
    /// or cleared.
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.operation.lock().await;

        if let Some(token) = self.store.get(StorageKey::AccessToken).await? {
            match self.gateway.revoke(&token).await {
                Ok(()) => debug!(client_id = %self.config.client_id, "Access token revoked"),
                Err(e) => warn!(
                    client_id = %self.config.client_id,
                    error = %e,
                    "Token revocation failed, clearing local tokens anyway"
                ),
            }
        }

        let cleared = async {
            self.store.remove(StorageKey::AccessToken).await?;
            self.store.remove(StorageKey::RefreshToken).await
        }
        .await;

        self.set_state(AuthState::Idle);
        self.publish_status().await;
        cleared?;

        info!(client_id = %self.config.client_id, "Signed out");
        Ok(())
    }

    /// Fetch the signed-in user's profile. Never cached.
    ///
    /// # Errors
    /// - `NotAuthenticated` when no access token is stored (no request made)
    /// - `UserInfoRequestFailed` on transport failure or non-2xx status
    pub async fn get_user_info(&self) -> Result<UserInfo> {
        let token = self.access_token().await?;
        self.gateway
            .user_info(&token)
            .await
            .map_err(|e| e.into_auth_error(AuthError::UserInfoRequestFailed))
    }

    /// Remove the sign-in nonce, retrying transient storage failures.
    ///
    /// A nonce left behind is harmless: the next attempt overwrites it.
    async fn clear_sign_in_session(&self) {
        let mut attempt = 1;
        loop {
            let Err(e) = self.store.remove(StorageKey::SignInSession).await else {
                return;
            };

            if e.is_retryable() && attempt < SESSION_CLEANUP_ATTEMPTS {
                debug!(client_id = %self.config.client_id, attempt, error = %e, "Retrying sign-in session cleanup");
                attempt += 1;
                continue;
            }

            if e.is_critical() {
                error!(client_id = %self.config.client_id, severity = %e.severity(), error = %e, "Failed to clear sign-in session");
            } else {
                warn!(client_id = %self.config.client_id, severity = %e.severity(), error = %e, "Failed to clear sign-in session");
            }
            return;
        }
    }

    fn set_state(&self, next: AuthState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(client_id = %self.config.client_id, from = ?*state, to = ?next, "Auth state changed");
            *state = next;
        }
    }

    async fn publish_status(&self) {
        let is_authenticated = match self.is_authenticated().await {
            Ok(authenticated) => authenticated,
            Err(e) => {
                warn!(client_id = %self.config.client_id, error = %e, "Could not read token store");
                false
            }
        };

        self.status.send_replace(AuthStatus { is_initialized: true, is_authenticated });
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
