//! Traits for the OAuth network and browser boundaries
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (the issuer's HTTP endpoints, the system browser).

use async_trait::async_trait;
use forceauth_domain::{AuthError, UserInfo};

use super::gateway::GatewayError;
use super::types::{AuthSessionRequest, AuthSessionResult, TokenResponse};

/// Token exchange, revocation and userinfo calls against the issuer
///
/// Every call is a single attempt with a finite timeout.
#[async_trait]
pub trait TokenGateway: Send + Sync {
    /// Exchange an authorization code for tokens and persist them
    ///
    /// The access token is always stored. The refresh token is stored when
    /// the response carries one and removed otherwise.
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status, undecodable body,
    /// or when the tokens cannot be persisted.
    async fn exchange(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, GatewayError>;

    /// Revoke a token at the issuer.
    async fn revoke(&self, token: &str) -> Result<(), GatewayError>;

    /// Fetch the profile of the user the access token belongs to.
    async fn user_info(&self, access_token: &str) -> Result<UserInfo, GatewayError>;
}

/// Browser-mediated authorization session
///
/// Opens the authorization URL and suspends until the issuer redirects to
/// `request.redirect_uri` or the user abandons the flow.
#[async_trait]
pub trait AuthSessionLauncher: Send + Sync {
    /// # Errors
    /// Returns `AuthError::AuthSessionFailed` when the session cannot start.
    async fn open(&self, request: AuthSessionRequest) -> Result<AuthSessionResult, AuthError>;

    /// Redirect URI used when the configuration does not name one.
    fn default_redirect_uri(&self) -> String;
}
