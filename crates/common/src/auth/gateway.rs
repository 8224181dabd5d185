//! HTTP gateway to the issuer's token, revocation and userinfo endpoints
//!
//! One attempt per call with the configured timeout. Token values never
//! appear in logs or error messages.

use async_trait::async_trait;
use forceauth_domain::{AuthConfig, AuthError, ConfigError, StorageKey, UserInfo};
use reqwest::{Client, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::traits::TokenGateway;
use super::types::{OAuthError, TokenResponse};
use crate::storage::{DynTokenStore, StorageError, TokenStore};

/// Longest raw response body echoed into an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Error type for gateway calls
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, TLS or timeout failure
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status
    #[error("{endpoint} endpoint returned {status}: {detail}")]
    Status { endpoint: &'static str, status: u16, detail: String },

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: &'static str, message: String },

    /// Tokens were issued but could not be persisted
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GatewayError {
    /// Map to the client-facing error kind for the failed operation.
    ///
    /// Storage failures always surface as `storage_unavailable`.
    #[must_use]
    pub fn into_auth_error(self, kind: fn(String) -> AuthError) -> AuthError {
        match self {
            Self::Storage(err) => err.into(),
            other => kind(other.to_string()),
        }
    }
}

/// Store a freshly issued token pair.
///
/// The access token is written first. If the refresh token cannot be
/// written (or a stale one removed), the access token is removed again so
/// a half-written pair never reads as signed in.
///
/// # Errors
/// Returns the first `StorageError` hit while writing the pair.
pub async fn persist_tokens(
    store: &dyn TokenStore,
    access_token: &str,
    refresh_token: Option<&str>,
) -> Result<(), StorageError> {
    store.set(StorageKey::AccessToken, access_token).await?;

    let paired = match refresh_token {
        Some(refresh) => store.set(StorageKey::RefreshToken, refresh).await,
        // A refresh token from an earlier session must not outlive it
        None => store.remove(StorageKey::RefreshToken).await,
    };

    if let Err(e) = paired {
        if let Err(cleanup) = store.remove(StorageKey::AccessToken).await {
            warn!(error = %cleanup, "Failed to roll back access token after refresh token write failure");
        }
        return Err(e);
    }

    Ok(())
}

/// reqwest-backed [`TokenGateway`]
///
/// Persists tokens into the client's store on successful exchange.
#[derive(Clone)]
pub struct OAuthGateway {
    config: AuthConfig,
    http: Client,
    store: DynTokenStore,
}

impl OAuthGateway {
    /// Build a gateway with the configuration's timeout.
    ///
    /// # Errors
    /// Returns `ConfigError::HttpClient` when the TLS backend cannot be
    /// initialised.
    pub fn new(config: AuthConfig, store: DynTokenStore) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { config, http, store })
    }

    /// `client_id` plus `client_secret` when one is configured.
    fn client_credentials(&self) -> Vec<(&'static str, &str)> {
        let mut form = vec![("client_id", self.config.client_id.as_str())];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        form
    }

    async fn status_error(endpoint: &'static str, response: Response) -> GatewayError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        let detail = match serde_json::from_str::<OAuthError>(&body) {
            Ok(provider) => provider.to_string(),
            Err(_) if body.trim().is_empty() => "empty response body".to_string(),
            Err(_) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        };

        debug!(endpoint, status, "Issuer returned error status");
        GatewayError::Status { endpoint, status, detail }
    }
}

#[async_trait]
impl TokenGateway for OAuthGateway {
    async fn exchange(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, GatewayError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
        ];
        form.extend(self.client_credentials());

        let endpoint = self.config.token_endpoint();
        debug!(client_id = %self.config.client_id, endpoint = %endpoint, "Exchanging authorization code");

        let response = self.http.post(&endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error("token", response).await);
        }

        let body = response.bytes().await?;
        let tokens: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Decode { endpoint: "token", message: e.to_string() })?;

        persist_tokens(self.store.as_ref(), &tokens.access_token, tokens.refresh_token.as_deref())
            .await?;

        info!(
            client_id = %self.config.client_id,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Authorization code exchanged"
        );

        Ok(tokens)
    }

    async fn revoke(&self, token: &str) -> Result<(), GatewayError> {
        let mut form = vec![("token", token)];
        form.extend(self.client_credentials());

        let response = self.http.post(self.config.revocation_endpoint()).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error("revoke", response).await);
        }

        debug!(client_id = %self.config.client_id, "Token revoked");
        Ok(())
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, GatewayError> {
        let response =
            self.http.get(self.config.userinfo_endpoint()).bearer_auth(access_token).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error("userinfo", response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Decode { endpoint: "userinfo", message: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::gateway.
    use std::sync::Arc;
    use std::time::Duration;

    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::{BrowserTokenStore, MemoryKeyValueStore, TokenStore};

    fn gateway(server: &MockServer, config: AuthConfig) -> (OAuthGateway, DynTokenStore) {
        let store: DynTokenStore = Arc::new(BrowserTokenStore::in_memory("C1"));
        let config = config.with_issuer_url(server.uri());
        (OAuthGateway::new(config, store.clone()).unwrap(), store)
    }

    /// Validates `OAuthGateway::exchange` behavior for the successful
    /// exchange scenario.
    ///
    /// Assertions:
    /// - Ensures the form body carries every required field.
    /// - Ensures no `client_secret` is sent when none is configured.
    /// - Confirms both tokens are persisted.
    #[tokio::test]
    async fn test_exchange_persists_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=ABC123"))
            .and(body_string_contains("code_verifier=verifier"))
            .and(body_string_contains("redirect_uri=app%3A%2F%2Fcb"))
            .and(body_string_contains("client_id=C1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "AT1",
                "refresh_token": "RT1",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, store) = gateway(&server, AuthConfig::new("C1"));
        let tokens = gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap();

        assert_eq!(tokens.access_token, "AT1");
        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap().as_deref(), Some("AT1"));
        assert_eq!(store.get(StorageKey::RefreshToken).await.unwrap().as_deref(), Some("RT1"));

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert!(!body.contains("client_secret"));
    }

    #[tokio::test]
    async fn test_exchange_sends_client_secret_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .and(body_string_contains("client_secret=s3cr3t"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "AT1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1").with_client_secret("s3cr3t"));
        gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap();
    }

    /// Validates `OAuthGateway::exchange` behavior when the response carries
    /// no refresh token.
    ///
    /// Assertions:
    /// - Confirms the new access token is stored.
    /// - Ensures a refresh token left by a previous session is removed.
    #[tokio::test]
    async fn test_exchange_without_refresh_token_clears_stale_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "AT2"})),
            )
            .mount(&server)
            .await;

        let (gateway, store) = gateway(&server, AuthConfig::new("C1"));
        store.set(StorageKey::RefreshToken, "OLD").await.unwrap();

        gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap();

        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap().as_deref(), Some("AT2"));
        assert_eq!(store.get(StorageKey::RefreshToken).await.unwrap(), None);
    }

    /// Validates `OAuthGateway::exchange` behavior for the provider error
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms the status is reported.
    /// - Ensures the provider's error description reaches the message.
    /// - Confirms it maps to `token_exchange_failed`.
    /// - Ensures nothing is persisted.
    #[tokio::test]
    async fn test_exchange_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "authentication failure"
            })))
            .mount(&server)
            .await;

        let (gateway, store) = gateway(&server, AuthConfig::new("C1"));
        let err = gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status { status: 400, .. }));
        assert!(err.to_string().contains("invalid_grant: authentication failure"));

        let auth = err.into_auth_error(AuthError::TokenExchangeFailed);
        assert_eq!(auth.code(), "token_exchange_failed");
        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_exchange_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1"));
        let err = gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode { endpoint: "token", .. }));
    }

    #[tokio::test]
    async fn test_exchange_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "AT1"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let (gateway, _store) =
            gateway(&server, AuthConfig::new("C1").with_http_timeout(Duration::from_secs(1)));
        let err = gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_revoke_posts_token_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/revoke"))
            .and(body_string_contains("token=AT1"))
            .and(body_string_contains("client_id=C1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1"));
        gateway.revoke("AT1").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/revoke"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1"));
        let err = gateway.revoke("AT1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { endpoint: "revoke", status: 500, .. }));
    }

    /// Validates `OAuthGateway::user_info` behavior for the bearer request
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the access token is sent as a bearer credential.
    /// - Confirms profile fields are decoded.
    #[tokio::test]
    async fn test_user_info_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/oauth2/userinfo"))
            .and(header("Authorization", "Bearer AT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "preferred_username": "ada@acme.org"
            })))
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1"));
        let info = gateway.user_info("AT1").await.unwrap();

        assert_eq!(info.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(info.preferred_username.as_deref(), Some("ada@acme.org"));
    }

    #[tokio::test]
    async fn test_user_info_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/oauth2/userinfo"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad_OAuth_Token"))
            .mount(&server)
            .await;

        let (gateway, _store) = gateway(&server, AuthConfig::new("C1"));
        let err = gateway.user_info("AT1").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status { status: 401, .. }));
        let auth = err.into_auth_error(AuthError::UserInfoRequestFailed);
        assert_eq!(auth.code(), "userinfo_request_failed");
        assert!(auth.message().contains("Bad_OAuth_Token"));
    }

    /// Token store whose refresh-token writes always fail
    struct RefreshWriteFailingStore(BrowserTokenStore<MemoryKeyValueStore, MemoryKeyValueStore>);

    #[async_trait]
    impl TokenStore for RefreshWriteFailingStore {
        async fn get(&self, key: StorageKey) -> crate::storage::StorageResult<Option<String>> {
            self.0.get(key).await
        }

        async fn set(&self, key: StorageKey, value: &str) -> crate::storage::StorageResult<()> {
            if key == StorageKey::RefreshToken {
                return Err(StorageError::Unavailable("keychain locked".into()));
            }
            self.0.set(key, value).await
        }

        async fn remove(&self, key: StorageKey) -> crate::storage::StorageResult<()> {
            self.0.remove(key).await
        }
    }

    /// Validates `OAuthGateway::exchange` behavior when the refresh token
    /// cannot be stored.
    ///
    /// Assertions:
    /// - Ensures the error maps to `storage_unavailable`.
    /// - Ensures the access token written just before is rolled back.
    #[tokio::test]
    async fn test_exchange_rolls_back_access_token_on_partial_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "AT1",
                "refresh_token": "RT1"
            })))
            .mount(&server)
            .await;

        let store: DynTokenStore =
            Arc::new(RefreshWriteFailingStore(BrowserTokenStore::in_memory("C1")));
        let config = AuthConfig::new("C1").with_issuer_url(server.uri());
        let gateway = OAuthGateway::new(config, store.clone()).unwrap();

        let err = gateway.exchange("ABC123", "verifier", "app://cb").await.unwrap_err();

        assert!(matches!(err, GatewayError::Storage(_)));
        assert_eq!(err.into_auth_error(AuthError::TokenExchangeFailed).code(), "storage_unavailable");
        assert_eq!(store.get(StorageKey::AccessToken).await.unwrap(), None);
    }

    #[test]
    fn test_storage_failure_maps_to_storage_unavailable() {
        let err = GatewayError::Storage(StorageError::Unavailable("locked".into()));
        assert_eq!(err.into_auth_error(AuthError::TokenExchangeFailed).code(), "storage_unavailable");
    }
}
