//! Browser-style plaintext token store
//!
//! Mirrors web storage: a session scope that ends with the browsing context
//! and a persistent scope that survives restarts. Only the sign-in nonce
//! lives in the session scope.

use std::path::PathBuf;

use async_trait::async_trait;
use forceauth_domain::StorageKey;
use tracing::debug;

use super::error::StorageResult;
use super::kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
use super::{namespaced_key, TokenStore};

/// Plaintext token store over a session scope `S` and persistent scope `L`
pub struct BrowserTokenStore<S, L> {
    client_id: String,
    session: S,
    persistent: L,
}

impl<S, L> BrowserTokenStore<S, L>
where
    S: KeyValueStore,
    L: KeyValueStore,
{
    /// Store for `client_id` over explicit session and persistent scopes.
    pub fn new(client_id: impl Into<String>, session: S, persistent: L) -> Self {
        Self { client_id: client_id.into(), session, persistent }
    }

    /// Scope holding `signInSession`.
    pub fn session_scope(&self) -> &S {
        &self.session
    }

    /// Scope holding the tokens.
    pub fn persistent_scope(&self) -> &L {
        &self.persistent
    }

    fn scope(&self, key: StorageKey) -> &dyn KeyValueStore {
        if key.is_session_scoped() {
            &self.session
        } else {
            &self.persistent
        }
    }
}

impl BrowserTokenStore<MemoryKeyValueStore, MemoryKeyValueStore> {
    /// Both scopes held in memory for the life of the process.
    pub fn in_memory(client_id: impl Into<String>) -> Self {
        Self::new(client_id, MemoryKeyValueStore::new(), MemoryKeyValueStore::new())
    }
}

impl BrowserTokenStore<MemoryKeyValueStore, FileKeyValueStore> {
    /// In-memory session scope with a file-backed persistent scope.
    ///
    /// # Errors
    /// Fails when the file exists but cannot be read or parsed.
    pub fn with_persistent_file(
        client_id: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        Ok(Self::new(client_id, MemoryKeyValueStore::new(), FileKeyValueStore::open(path)?))
    }
}

#[async_trait]
impl<S, L> TokenStore for BrowserTokenStore<S, L>
where
    S: KeyValueStore,
    L: KeyValueStore,
{
    async fn get(&self, key: StorageKey) -> StorageResult<Option<String>> {
        self.scope(key).get(&namespaced_key(&self.client_id, key))
    }

    async fn set(&self, key: StorageKey, value: &str) -> StorageResult<()> {
        let name = namespaced_key(&self.client_id, key);
        self.scope(key).set(&name, value)?;
        debug!(key = %name, session = key.is_session_scoped(), "Stored value in browser storage");
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> StorageResult<()> {
        self.scope(key).remove(&namespaced_key(&self.client_id, key))
    }
}
