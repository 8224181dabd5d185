//! Authentication core shared by forceauth crates.
//!
//! PKCE primitives, encrypted token storage, the OAuth gateway and the
//! sign-in orchestrator. Host integrations (browser launcher, config files,
//! logging setup) live in `forceauth-infra`.
//!
//! # Feature Tiers
//!
//! - `platform` (default): OS keychain via `keyring`
//! - `test-utils`: in-memory mocks in [`testing`]

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
pub mod crypto;
pub mod error;
pub mod security;
pub mod storage;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use auth::{AuthClient, AuthSessionLauncher, TokenGateway};
pub use crypto::{EncryptedData, EncryptionService};
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "platform")]
pub use security::KeychainProvider;
pub use security::{KeychainError, SecureElement};
pub use storage::{DynTokenStore, StorageError, TokenStore, TokenStoreKind};
