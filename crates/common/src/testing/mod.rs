//! Testing utilities and helpers
//!
//! In-memory doubles for the secure element, the browser session and the
//! issuer. Enabled for this crate's own tests and, through the `test-utils`
//! feature, for downstream crates.
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "test-utils")]
//! # {
//! use std::sync::Arc;
//!
//! use forceauth_common::storage::{DynTokenStore, EncryptedTokenStore, MemoryKeyValueStore};
//! use forceauth_common::testing::{MockAuthSession, MockKeychainProvider};
//!
//! let store: DynTokenStore = Arc::new(EncryptedTokenStore::new(
//!     "C1",
//!     MockKeychainProvider::new(),
//!     MemoryKeyValueStore::new(),
//! ));
//! let session = MockAuthSession::approving("ABC123");
//! # let _ = (store, session);
//! # }
//! ```

pub mod mocks;

pub use mocks::{
    state_from_authorization_url, ExchangeCall, MockAuthSession, MockKeychainProvider,
    MockTokenGateway, SessionScript,
};
