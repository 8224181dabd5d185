//! Token storage
//!
//! [`TokenStore`] is the single capability the rest of the crate depends on.
//! Two variants exist and one is chosen when the client is built:
//!
//! - [`EncryptedTokenStore`]: encrypted at rest. Each value is sealed with a
//!   fresh AES-256-GCM key; the key goes into the secure element and the
//!   ciphertext into general-purpose storage.
//! - [`BrowserTokenStore`]: plaintext, split between a session scope (the
//!   sign-in nonce) and a persistent scope (tokens).
//!
//! Keys are namespaced as `forceauth:{client_id}:{key}` so several clients
//! can share one backend.

pub mod browser;
pub mod encrypted;
pub mod error;
pub mod kv;

use std::sync::Arc;

use async_trait::async_trait;
use forceauth_domain::constants::STORAGE_KEY_PREFIX;
use forceauth_domain::StorageKey;

pub use browser::BrowserTokenStore;
pub use encrypted::EncryptedTokenStore;
pub use error::{StorageError, StorageResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

/// Asynchronous key/value capability for token persistence
///
/// `get` returns `None` for keys never written or already removed, and
/// `remove` is idempotent.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns `StorageError` when the backend cannot be read.
    async fn get(&self, key: StorageKey) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns `StorageError` when the backend cannot be written. A failed
    /// write leaves the previous value readable.
    async fn set(&self, key: StorageKey, value: &str) -> StorageResult<()>;

    /// Delete `key`.
    ///
    /// # Errors
    /// Returns `StorageError` when the backend cannot be written.
    async fn remove(&self, key: StorageKey) -> StorageResult<()>;
}

/// Shared, type-erased token store
pub type DynTokenStore = Arc<dyn TokenStore>;

/// Which storage variant backs a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStoreKind {
    /// OS keychain plus encrypted file
    SecureElement,
    /// Plaintext web-style storage
    BrowserStorage,
}

impl TokenStoreKind {
    /// Open the platform store of this kind under `data_dir`.
    ///
    /// # Errors
    /// Returns `StorageError` when the backing file exists but cannot be read
    /// or parsed.
    #[cfg(feature = "platform")]
    pub fn open(
        self,
        client_id: &str,
        data_dir: impl AsRef<std::path::Path>,
    ) -> StorageResult<DynTokenStore> {
        let data_dir = data_dir.as_ref();
        let store: DynTokenStore = match self {
            Self::SecureElement => {
                let ciphertexts = FileKeyValueStore::open(data_dir.join("tokens.enc.json"))?;
                Arc::new(EncryptedTokenStore::new(
                    client_id,
                    crate::security::KeychainProvider::new(STORAGE_KEY_PREFIX),
                    ciphertexts,
                ))
            }
            Self::BrowserStorage => Arc::new(BrowserTokenStore::with_persistent_file(
                client_id,
                data_dir.join("local-storage.json"),
            )?),
        };

        tracing::debug!(kind = ?self, client_id = %client_id, "Opened token store");

        Ok(store)
    }
}

/// Storage key for `key` under `client_id`.
#[must_use]
pub fn namespaced_key(client_id: &str, key: StorageKey) -> String {
    format!("{STORAGE_KEY_PREFIX}:{client_id}:{}", key.as_str())
}
