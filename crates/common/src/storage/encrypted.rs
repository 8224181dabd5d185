//! Encrypted-at-rest token store
//!
//! Values are too large for the secure element, so each write:
//!
//! 1. generates a fresh 256-bit key,
//! 2. seals the value with AES-256-GCM and writes the ciphertext to the
//!    general-purpose store,
//! 3. writes the base64 key to the secure element under the same name.
//!
//! If step 3 fails the previous ciphertext is put back, so the previous
//! value stays readable with the previous key.
//!
//! The key is the authority: without it the ciphertext is unrecoverable and
//! treated as absent. `remove` deletes the key first for that reason.
//!
//! ```text
//!            set("accessToken", v)
//!                     │
//!        ┌────────────┴────────────┐
//!        ▼                         ▼
//!  KeyValueStore              SecureElement
//!  forceauth:C1:accessToken   forceauth:C1:accessToken
//!  = base64(JSON{nonce,ct})   = base64(key)       (≤ 2048 bytes)
//! ```

use async_trait::async_trait;
use forceauth_domain::StorageKey;
use tracing::{debug, warn};

use super::error::StorageResult;
use super::kv::KeyValueStore;
use super::{namespaced_key, TokenStore};
use crate::crypto::EncryptionService;
use crate::security::SecureElement;

/// Token store splitting key material and ciphertext between two backends
pub struct EncryptedTokenStore<S, K> {
    client_id: String,
    secure: S,
    ciphertexts: K,
}

impl<S, K> EncryptedTokenStore<S, K>
where
    S: SecureElement,
    K: KeyValueStore,
{
    /// Store for `client_id` keeping keys in `secure` and ciphertexts in `ciphertexts`.
    pub fn new(client_id: impl Into<String>, secure: S, ciphertexts: K) -> Self {
        Self { client_id: client_id.into(), secure, ciphertexts }
    }

    /// Secure element holding the per-value keys.
    pub fn secure_element(&self) -> &S {
        &self.secure
    }

    /// General-purpose store holding ciphertexts.
    pub fn ciphertext_store(&self) -> &K {
        &self.ciphertexts
    }

    fn key_for(&self, key: StorageKey) -> String {
        namespaced_key(&self.client_id, key)
    }

    /// Drop ciphertext whose key is gone. Failures only cost disk space.
    fn discard_orphan(&self, name: &str) {
        match self.ciphertexts.get(name) {
            Ok(Some(_)) => {
                if let Err(e) = self.ciphertexts.remove(name) {
                    debug!(key = %name, error = %e, "Failed to remove orphaned ciphertext");
                } else {
                    debug!(key = %name, "Removed orphaned ciphertext");
                }
            }
            Ok(None) => {}
            Err(e) => debug!(key = %name, error = %e, "Failed to probe for orphaned ciphertext"),
        }
    }
}

#[async_trait]
impl<S, K> TokenStore for EncryptedTokenStore<S, K>
where
    S: SecureElement,
    K: KeyValueStore,
{
    async fn get(&self, key: StorageKey) -> StorageResult<Option<String>> {
        let name = self.key_for(key);

        let Some(encoded_key) = self.secure.get_secret(&name)? else {
            self.discard_orphan(&name);
            return Ok(None);
        };

        let Some(ciphertext) = self.ciphertexts.get(&name)? else {
            return Ok(None);
        };

        let opened = EncryptionService::from_base64_key(&encoded_key)
            .and_then(|service| service.decrypt_from_string(&ciphertext))
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| {
                    crate::CommonError::serialization_format("utf-8", e.to_string())
                })
            });

        match opened {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Key and ciphertext from different writes
                warn!(key = %name, error = %e, "Stored value could not be decrypted, treating as absent");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: StorageKey, value: &str) -> StorageResult<()> {
        let name = self.key_for(key);

        let service = EncryptionService::new(EncryptionService::generate_key())?;
        let ciphertext = service.encrypt_to_string(value.as_bytes())?;

        let previous = self.ciphertexts.get(&name)?;
        self.ciphertexts.set(&name, &ciphertext)?;

        if let Err(e) = self.secure.set_secret(&name, &service.export_key()) {
            // The old key is still in place, so the old ciphertext must be too
            let rollback = match previous.as_deref() {
                Some(old) => self.ciphertexts.set(&name, old),
                None => self.ciphertexts.remove(&name),
            };
            if let Err(cleanup) = rollback {
                warn!(key = %name, error = %cleanup, "Failed to roll back ciphertext after key write failure");
            }
            return Err(e.into());
        }

        debug!(key = %name, "Stored encrypted value");
        Ok(())
    }

    async fn remove(&self, key: StorageKey) -> StorageResult<()> {
        let name = self.key_for(key);

        self.secure.delete_secret(&name)?;

        if let Err(e) = self.ciphertexts.remove(&name) {
            warn!(key = %name, error = %e, "Ciphertext left behind after key removal");
        }

        debug!(key = %name, "Removed encrypted value");
        Ok(())
    }
}
