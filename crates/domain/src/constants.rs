//! Issuer constants
//!
//! Hosts and endpoint paths of the Salesforce OAuth 2.0 endpoints, plus the
//! defaults applied when a configuration leaves a value unset.

/// Production login host.
pub const PRODUCTION_HOST: &str = "login.salesforce.com";
/// Sandbox login host.
pub const SANDBOX_HOST: &str = "test.salesforce.com";

pub const AUTHORIZE_PATH: &str = "/services/oauth2/authorize";
pub const TOKEN_PATH: &str = "/services/oauth2/token";
pub const REVOKE_PATH: &str = "/services/oauth2/revoke";
pub const USERINFO_PATH: &str = "/services/oauth2/userinfo";

/// Network timeout applied to token, revoke and userinfo calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Prefix used to namespace browser-storage keys.
pub const STORAGE_KEY_PREFIX: &str = "forceauth";
