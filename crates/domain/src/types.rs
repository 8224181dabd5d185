//! Data types shared across the authentication core

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical keys persisted by a token store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    /// State nonce of the sign-in attempt in progress
    SignInSession,
}

impl StorageKey {
    /// Name under which the value is persisted.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::SignInSession => "signInSession",
        }
    }

    /// Whether the value lives only as long as the browsing context.
    #[must_use]
    pub fn is_session_scoped(&self) -> bool {
        matches!(self, Self::SignInSession)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile returned by the issuer's userinfo endpoint
///
/// Always fetched fresh; never cached by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Remaining claims, kept verbatim
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}
