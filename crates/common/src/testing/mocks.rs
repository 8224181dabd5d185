//! Mock implementations of the crate's seams
//!
//! In-memory stand-ins for the secure element, the browser session and the
//! issuer. All mocks are cheap to clone; clones share state so a test can
//! keep a handle after passing one to the client.

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use forceauth_domain::{AuthError, UserInfo};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::auth::{
    persist_tokens, AuthSessionLauncher, AuthSessionRequest, AuthSessionResult, GatewayError, TokenGateway,
    TokenResponse,
};
use crate::security::keychain::check_item_size;
use crate::security::{KeychainError, SecureElement, MAX_SECURE_ITEM_BYTES};
use crate::storage::DynTokenStore;

type StorageData = Arc<Mutex<HashMap<String, String>>>;

/// Mock keychain provider for testing
///
/// Stores secrets in memory and enforces the same per-item ceiling as the
/// real keychain. Individual operations can be made to fail.
#[derive(Debug, Clone)]
pub struct MockKeychainProvider {
    storage: StorageData,
    max_item_bytes: usize,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl MockKeychainProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_item_bytes(MAX_SECURE_ITEM_BYTES)
    }

    #[must_use]
    pub fn with_max_item_bytes(max_item_bytes: usize) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            max_item_bytes,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_deletes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.storage.lock().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Drop every item, as if the keychain had been reset.
    pub fn clear(&self) {
        self.storage.lock().clear();
    }

    fn unavailable(op: &str) -> KeychainError {
        KeychainError::AccessFailed(format!("mock keychain {op} disabled"))
    }
}

impl Default for MockKeychainProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureElement for MockKeychainProvider {
    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("read"));
        }
        Ok(self.storage.lock().get(key).cloned())
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("write"));
        }
        check_item_size(key, value, self.max_item_bytes)?;
        self.storage.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::unavailable("delete"));
        }
        self.storage.lock().remove(key);
        Ok(())
    }

    fn max_item_bytes(&self) -> usize {
        self.max_item_bytes
    }
}

/// Scripted outcome of a [`MockAuthSession`]
#[derive(Debug, Clone)]
pub enum SessionScript {
    /// Redirect back with `code` and the state from the request.
    Approve { code: String },
    /// Redirect back with `code` and a fixed, possibly foreign, state.
    ApproveWithState { code: String, state: String },
    /// End the session with this result verbatim.
    Respond(AuthSessionResult),
    /// Fail to start the session.
    Fail(AuthError),
}

/// Browser session that answers from a script instead of a browser
#[derive(Debug, Clone)]
pub struct MockAuthSession {
    script: Arc<Mutex<SessionScript>>,
    requests: Arc<Mutex<Vec<AuthSessionRequest>>>,
    default_redirect_uri: String,
    started: Arc<Notify>,
    gate: Option<Arc<Notify>>,
}

impl MockAuthSession {
    #[must_use]
    pub fn new(script: SessionScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            requests: Arc::new(Mutex::new(Vec::new())),
            default_redirect_uri: "app://cb".to_string(),
            started: Arc::new(Notify::new()),
            gate: None,
        }
    }

    /// Session that approves with `code`.
    #[must_use]
    pub fn approving(code: impl Into<String>) -> Self {
        Self::new(SessionScript::Approve { code: code.into() })
    }

    /// Session that ends with `result`.
    #[must_use]
    pub fn responding(result: AuthSessionResult) -> Self {
        Self::new(SessionScript::Respond(result))
    }

    #[must_use]
    pub fn with_default_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.default_redirect_uri = uri.into();
        self
    }

    /// Hold every session open until `gate` is notified.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_script(&self, script: SessionScript) {
        *self.script.lock() = script;
    }

    /// Notified each time a session opens.
    #[must_use]
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }

    #[must_use]
    pub fn requests(&self) -> Vec<AuthSessionRequest> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn redirect(request: &AuthSessionRequest, code: &str, state: &str) -> AuthSessionResult {
        let separator = if request.redirect_uri.contains('?') { '&' } else { '?' };
        AuthSessionResult::Success {
            url: format!(
                "{}{separator}code={}&state={}",
                request.redirect_uri,
                urlencoding::encode(code),
                urlencoding::encode(state)
            ),
        }
    }
}

/// State parameter of an authorization URL
#[must_use]
pub fn state_from_authorization_url(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl AuthSessionLauncher for MockAuthSession {
    async fn open(&self, request: AuthSessionRequest) -> Result<AuthSessionResult, AuthError> {
        self.requests.lock().push(request.clone());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let script = self.script.lock().clone();
        match script {
            SessionScript::Approve { code } => {
                let state = state_from_authorization_url(&request.url).unwrap_or_default();
                Ok(Self::redirect(&request, &code, &state))
            }
            SessionScript::ApproveWithState { code, state } => {
                Ok(Self::redirect(&request, &code, &state))
            }
            SessionScript::Respond(result) => Ok(result),
            SessionScript::Fail(error) => Err(error),
        }
    }

    fn default_redirect_uri(&self) -> String {
        self.default_redirect_uri.clone()
    }
}

/// Recorded `exchange` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCall {
    pub code: String,
    pub code_verifier: String,
    pub redirect_uri: String,
}

/// Issuer stand-in that persists tokens like the real gateway
#[derive(Clone)]
pub struct MockTokenGateway {
    store: DynTokenStore,
    access_token: Arc<Mutex<String>>,
    refresh_token: Arc<Mutex<Option<String>>>,
    user_info: Arc<Mutex<UserInfo>>,
    fail_exchange: Arc<AtomicBool>,
    fail_revoke: Arc<AtomicBool>,
    exchanges: Arc<Mutex<Vec<ExchangeCall>>>,
    revoked: Arc<Mutex<Vec<String>>>,
    user_info_calls: Arc<Mutex<usize>>,
}

impl MockTokenGateway {
    /// Gateway issuing `AT1` / `RT1` into `store`.
    #[must_use]
    pub fn new(store: DynTokenStore) -> Self {
        Self {
            store,
            access_token: Arc::new(Mutex::new("AT1".to_string())),
            refresh_token: Arc::new(Mutex::new(Some("RT1".to_string()))),
            user_info: Arc::new(Mutex::new(UserInfo::default())),
            fail_exchange: Arc::new(AtomicBool::new(false)),
            fail_revoke: Arc::new(AtomicBool::new(false)),
            exchanges: Arc::new(Mutex::new(Vec::new())),
            revoked: Arc::new(Mutex::new(Vec::new())),
            user_info_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set_tokens(&self, access_token: impl Into<String>, refresh_token: Option<&str>) {
        *self.access_token.lock() = access_token.into();
        *self.refresh_token.lock() = refresh_token.map(str::to_string);
    }

    pub fn set_user_info(&self, info: UserInfo) {
        *self.user_info.lock() = info;
    }

    pub fn set_fail_exchange(&self, fail: bool) {
        self.fail_exchange.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_revoke(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn exchanges(&self) -> Vec<ExchangeCall> {
        self.exchanges.lock().clone()
    }

    #[must_use]
    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().clone()
    }

    #[must_use]
    pub fn user_info_calls(&self) -> usize {
        *self.user_info_calls.lock()
    }

    fn rejected(endpoint: &'static str, status: u16) -> GatewayError {
        GatewayError::Status { endpoint, status, detail: "mock rejection".to_string() }
    }
}

#[async_trait]
impl TokenGateway for MockTokenGateway {
    async fn exchange(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, GatewayError> {
        self.exchanges.lock().push(ExchangeCall {
            code: code.to_string(),
            code_verifier: code_verifier.to_string(),
            redirect_uri: redirect_uri.to_string(),
        });

        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(Self::rejected("token", 400));
        }

        let access_token = self.access_token.lock().clone();
        let refresh_token = self.refresh_token.lock().clone();

        persist_tokens(self.store.as_ref(), &access_token, refresh_token.as_deref()).await?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: Some("Bearer".to_string()),
            scope: None,
            instance_url: None,
            id: None,
            issued_at: None,
            id_token: None,
        })
    }

    async fn revoke(&self, token: &str) -> Result<(), GatewayError> {
        self.revoked.lock().push(token.to_string());
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(Self::rejected("revoke", 500));
        }
        Ok(())
    }

    async fn user_info(&self, _access_token: &str) -> Result<UserInfo, GatewayError> {
        *self.user_info_calls.lock() += 1;
        Ok(self.user_info.lock().clone())
    }
}
