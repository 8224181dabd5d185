//! OAuth 2.0 Authorization Code + PKCE sign-in
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   AuthClient    │  Orchestrator: state machine + status observer
//! └────────┬────────┘
//!          │
//!          ├──► AuthSessionLauncher  (browser step, supplied by the host)
//!          ├──► TokenGateway         (token / revoke / userinfo over HTTPS)
//!          │         │
//!          │         ▼
//!          └──► TokenStore           (encrypted or browser-style storage)
//!
//!           PKCE utilities           (verifier, challenge, state)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use forceauth_common::auth::{AuthClient, AuthSessionLauncher};
//! use forceauth_common::storage::{DynTokenStore, TokenStoreKind};
//! use forceauth_domain::AuthConfig;
//!
//! async fn sign_in(launcher: Arc<dyn AuthSessionLauncher>) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("3MVG9...").with_sandbox(true);
//!     let store: DynTokenStore = TokenStoreKind::SecureElement.open(&config.client_id, "/var/lib/app")?;
//!
//!     let client = AuthClient::new(config, store, launcher)?;
//!     client.initialize().await?;
//!     client.sign_in().await?;
//!
//!     let me = client.get_user_info().await?;
//!     println!("Signed in as {:?}", me.preferred_username);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: PKCE challenge generation and state validation
//! - **[`types`]**: Token response, session and status types
//! - **[`traits`]**: Gateway and session launcher seams
//! - **[`gateway`]**: reqwest implementation of the gateway
//! - **[`client`]**: The orchestrator

pub mod client;
pub mod gateway;
pub mod pkce;
pub mod traits;
pub mod types;

pub use client::{build_authorization_url, AuthClient};
pub use gateway::{persist_tokens, GatewayError, OAuthGateway};
pub use pkce::PkceChallenge;
// Re-export PKCE utility functions
pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, random_string,
    validate_state,
};
pub use traits::{AuthSessionLauncher, TokenGateway};
pub use types::{
    AuthSessionRequest, AuthSessionResult, AuthState, AuthStatus, OAuthError, TokenResponse,
};
