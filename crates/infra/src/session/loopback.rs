//! Loopback redirect session
//!
//! Serves the redirect URI on `127.0.0.1` for the length of one
//! authorization attempt. The browser is sent to the authorization URL; the
//! first request to the redirect path ends the session.
//!
//! ```text
//! open(request)
//!   ├─ bind 127.0.0.1:{port}, route {path}
//!   ├─ BrowserOpener::open(request.url)
//!   └─ select!
//!        callback   → Success { url } | Cancel | Error
//!        cancelled  → Cancel
//!        timeout    → Dismiss
//! ```

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{OriginalUri, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use forceauth_common::auth::{AuthSessionLauncher, AuthSessionRequest, AuthSessionResult};
use forceauth_domain::AuthError;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::browser::{BrowserOpener, SystemBrowser};

/// Redirect URI used when the configuration names none.
pub const DEFAULT_LOOPBACK_REDIRECT_URI: &str = "http://localhost:8788/callback";

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Complete</title></head>
<body><h1>Authorization Complete</h1><p>You can close this window.</p></body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Failed</title></head>
<body><h1>Authorization Failed</h1><p>You can close this window and try again.</p></body>
</html>"#;

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<String>>>>;

#[derive(Clone)]
struct CallbackState {
    origin: String,
    sender: CallbackSender,
}

/// [`AuthSessionLauncher`] backed by a loopback HTTP listener
pub struct LoopbackAuthSession {
    opener: Arc<dyn BrowserOpener>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    default_redirect_uri: String,
}

impl LoopbackAuthSession {
    /// Session opening the system browser, without a timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_opener(Arc::new(SystemBrowser))
    }

    /// Session that opens URLs through `opener` instead of the system browser.
    #[must_use]
    pub fn with_opener(opener: Arc<dyn BrowserOpener>) -> Self {
        Self {
            opener,
            cancel: CancellationToken::new(),
            timeout: None,
            default_redirect_uri: DEFAULT_LOOPBACK_REDIRECT_URI.to_string(),
        }
    }

    /// End the waiting session with `Dismiss` after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cancel from the host with a token it already owns.
    #[must_use]
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Redirect URI used when the client config has none.
    #[must_use]
    pub fn with_default_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.default_redirect_uri = uri.into();
        self
    }

    /// Token whose cancellation ends a waiting session with `Cancel`.
    ///
    /// A cancelled token stays cancelled; later sessions end immediately.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for LoopbackAuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoopbackAuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackAuthSession")
            .field("timeout", &self.timeout)
            .field("default_redirect_uri", &self.default_redirect_uri)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Port and path the listener serves for `redirect_uri`.
fn loopback_target(redirect_uri: &str) -> Result<(u16, String, String), AuthError> {
    let url = Url::parse(redirect_uri).map_err(|e| {
        AuthError::AuthSessionFailed(format!("invalid redirect URI '{redirect_uri}': {e}"))
    })?;

    if url.scheme() != "http" {
        return Err(AuthError::AuthSessionFailed(format!(
            "redirect URI '{redirect_uri}' is not an http loopback URI"
        )));
    }

    let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1"));
    if !loopback {
        return Err(AuthError::AuthSessionFailed(format!(
            "redirect URI '{redirect_uri}' does not point at localhost"
        )));
    }

    let port = url.port().ok_or_else(|| {
        AuthError::AuthSessionFailed(format!("redirect URI '{redirect_uri}' has no explicit port"))
    })?;

    Ok((port, url.path().to_string(), url.origin().ascii_serialization()))
}

/// Map the callback URL to a session outcome.
fn classify_callback(callback_url: &str) -> AuthSessionResult {
    let Ok(url) = Url::parse(callback_url) else {
        return AuthSessionResult::Error(format!("unparseable callback URL '{callback_url}'"));
    };

    let param = |name: &str| {
        url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
    };

    match param("error") {
        Some(error) if error == "access_denied" => AuthSessionResult::Cancel,
        Some(error) => match param("error_description") {
            Some(description) => AuthSessionResult::Error(format!("{error}: {description}")),
            None => AuthSessionResult::Error(error),
        },
        None => AuthSessionResult::Success { url: callback_url.to_string() },
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    OriginalUri(uri): OriginalUri,
) -> Html<&'static str> {
    let callback_url = format!("{}{}", state.origin, uri);
    let failed = matches!(classify_callback(&callback_url), AuthSessionResult::Error(_));

    match state.sender.lock().take() {
        Some(sender) => {
            if sender.send(callback_url).is_err() {
                debug!("Callback arrived after the session ended");
            }
        }
        None => debug!("Ignoring repeated callback"),
    }

    if failed {
        Html(FAILURE_PAGE)
    } else {
        Html(SUCCESS_PAGE)
    }
}

#[async_trait]
impl AuthSessionLauncher for LoopbackAuthSession {
    async fn open(&self, request: AuthSessionRequest) -> Result<AuthSessionResult, AuthError> {
        let (port, path, origin) = loopback_target(&request.redirect_uri)?;

        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            AuthError::AuthSessionFailed(format!("failed to bind loopback port {port}: {e}"))
        })?;

        let (callback_tx, callback_rx) = oneshot::channel();
        let state = CallbackState { origin, sender: Arc::new(Mutex::new(Some(callback_tx))) };
        let app = Router::new().route(&path, get(handle_callback)).with_state(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "Loopback redirect server error");
            }
        });

        info!(port, path = %path, "Waiting for authorization redirect");

        let outcome = self.await_redirect(&request, callback_rx).await;

        let _ = shutdown_tx.send(());
        if let Err(err) = server.await {
            warn!(error = %err, "Loopback redirect server task failed");
        }

        if let Ok(result) = &outcome {
            debug!(outcome = result.kind(), "Loopback session ended");
        }
        outcome
    }

    fn default_redirect_uri(&self) -> String {
        self.default_redirect_uri.clone()
    }
}

impl LoopbackAuthSession {
    async fn await_redirect(
        &self,
        request: &AuthSessionRequest,
        callback_rx: oneshot::Receiver<String>,
    ) -> Result<AuthSessionResult, AuthError> {
        let opener = Arc::clone(&self.opener);
        let url = request.url.clone();
        let ephemeral = request.prefer_ephemeral_session;

        tokio::task::spawn_blocking(move || opener.open(&url, ephemeral))
            .await
            .map_err(|e| AuthError::AuthSessionFailed(format!("browser launcher panicked: {e}")))?
            .map_err(|e| AuthError::AuthSessionFailed(e.to_string()))?;

        let timeout = self.timeout;
        let expired = async move {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            callback = callback_rx => match callback {
                Ok(callback_url) => Ok(classify_callback(&callback_url)),
                Err(_) => Err(AuthError::AuthSessionFailed("loopback server stopped".into())),
            },
            () = self.cancel.cancelled() => Ok(AuthSessionResult::Cancel),
            () = expired => Ok(AuthSessionResult::Dismiss),
        }
    }
}
