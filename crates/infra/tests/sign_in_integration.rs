//! Integration tests for the desktop sign-in stack
//!
//! Runs `AuthClient` over a real `LoopbackAuthSession`, with a scripted
//! browser playing the issuer's redirect and wiremock playing the token
//! endpoints.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use forceauth_common::auth::AuthClient;
use forceauth_common::storage::{BrowserTokenStore, DynTokenStore, TokenStore};
use forceauth_domain::{AuthConfig, StorageKey};
use forceauth_infra::{config, BrowserError, BrowserOpener, LoopbackAuthSession};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Browser stand-in: approves every authorization URL it is given by
/// requesting the redirect URI with `code` and the URL's own state.
struct ApprovingBrowser {
    code: &'static str,
    state_override: Option<&'static str>,
}

impl BrowserOpener for ApprovingBrowser {
    fn open(&self, url: &str, _prefer_ephemeral_session: bool) -> Result<(), BrowserError> {
        let url = url::Url::parse(url).map_err(|e| {
            BrowserError::Launch(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let param = |name: &str| {
            url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned()).unwrap_or_default()
        };

        let state = self.state_override.map_or_else(|| param("state"), str::to_string);
        let callback = format!("{}?code={}&state={}", param("redirect_uri"), self.code, state);

        tokio::runtime::Handle::current().spawn(async move {
            if let Ok(client) = reqwest::Client::builder().no_proxy().build() {
                let _ = client.get(callback).send().await;
            }
        });
        Ok(())
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

/// Validates a full desktop sign-in.
///
/// # Test Steps
/// 1. Configure `C1` with a loopback redirect on a free port
/// 2. Browser stand-in follows the redirect with `code=ABC123`
/// 3. Token endpoint returns `AT1` / `RT1`
/// 4. Verify the client is authenticated and sign-out clears the tokens
#[tokio::test(flavor = "multi_thread")]
async fn test_loopback_sign_in_and_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("code=ABC123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "AT1",
            "refresh_token": "RT1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let redirect_uri = format!("http://localhost:{}/callback", free_port());
    let config = AuthConfig::new("C1").with_redirect_uri(&redirect_uri).with_issuer_url(server.uri());
    let store: DynTokenStore = Arc::new(BrowserTokenStore::in_memory("C1"));
    let session = LoopbackAuthSession::with_opener(Arc::new(ApprovingBrowser {
        code: "ABC123",
        state_override: None,
    }))
    .with_timeout(Duration::from_secs(10));

    let client = AuthClient::new(config, store.clone(), Arc::new(session)).unwrap();

    client.sign_in().await.unwrap();
    assert!(client.is_authenticated().await.unwrap());
    assert_eq!(store.get(StorageKey::RefreshToken).await.unwrap().as_deref(), Some("RT1"));

    client.sign_out().await.unwrap();
    assert!(!client.is_authenticated().await.unwrap());
}

/// Validates that a forged redirect never reaches the token endpoint.
///
/// # Test Steps
/// 1. Browser stand-in redirects with `state=WRONG`
/// 2. Verify `invalid_state` and no token request
#[tokio::test(flavor = "multi_thread")]
async fn test_loopback_forged_state_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let redirect_uri = format!("http://127.0.0.1:{}/cb", free_port());
    let config = AuthConfig::new("C1").with_redirect_uri(&redirect_uri).with_issuer_url(server.uri());
    let session = LoopbackAuthSession::with_opener(Arc::new(ApprovingBrowser {
        code: "ABC123",
        state_override: Some("WRONG"),
    }))
    .with_timeout(Duration::from_secs(10));

    let client =
        AuthClient::new(config, Arc::new(BrowserTokenStore::in_memory("C1")), Arc::new(session))
            .unwrap();

    let err = client.sign_in().await.unwrap_err();
    assert_eq!(err.code(), "invalid_state");
    assert!(!client.is_authenticated().await.unwrap());
}

/// Validates that a config file feeds a working client.
///
/// # Test Steps
/// 1. Write a TOML config naming a custom issuer
/// 2. Load it and build a client
/// 3. Verify the endpoints follow the issuer
#[test]
fn test_config_file_builds_client() {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(
            br#"
client_id = "C1"
issuer_url = "https://acme.my.salesforce.com"
prompt = ["login", "consent"]
http_timeout_secs = 5
"#,
        )
        .expect("Failed to write to temp file");
    let path = temp_file.path().with_extension("toml");
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");

    let config = config::load_from_file(Some(path.clone())).unwrap();
    std::fs::remove_file(path).ok();

    assert_eq!(
        config.token_endpoint(),
        "https://acme.my.salesforce.com/services/oauth2/token"
    );
    assert_eq!(config.http_timeout(), Duration::from_secs(5));

    let client = AuthClient::new(
        config,
        Arc::new(BrowserTokenStore::in_memory("C1")),
        Arc::new(LoopbackAuthSession::new()),
    );
    assert!(client.is_ok());
}
