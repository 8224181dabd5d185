//! Secure element abstraction and the platform keychain provider
//!
//! A secure element is small, OS-backed secret storage: macOS Keychain
//! Access, Windows Credential Manager, or the Linux Secret Service. Items are
//! capped at [`MAX_SECURE_ITEM_BYTES`], so only key material is written here;
//! larger payloads are encrypted and kept elsewhere (see
//! `storage::encrypted`).
//!
//! ## Usage
//!
//! ```no_run
//! use forceauth_common::security::{KeychainProvider, SecureElement};
//!
//! let keychain = KeychainProvider::new("forceauth");
//! keychain.set_secret("forceauth:C1:accessToken", "c2VjcmV0")?;
//! assert_eq!(keychain.get_secret("forceauth:C1:accessToken")?.as_deref(), Some("c2VjcmV0"));
//! # Ok::<(), forceauth_common::security::KeychainError>(())
//! ```

#[cfg(feature = "platform")]
use keyring::Entry;
use thiserror::Error;
#[cfg(feature = "platform")]
use tracing::debug;

/// Per-item size ceiling of the secure element, in bytes.
pub const MAX_SECURE_ITEM_BYTES: usize = 2048;

/// Small-capacity secret storage keyed by string
///
/// Implementations must be safe to share across tasks. Deleting a missing
/// item is not an error.
pub trait SecureElement: Send + Sync {
    /// Read a secret; `Ok(None)` when no item exists under `key`.
    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError>;

    /// Write (or overwrite) a secret.
    ///
    /// # Errors
    /// `KeychainError::ItemTooLarge` when `value` exceeds
    /// [`SecureElement::max_item_bytes`].
    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError>;

    /// Delete a secret (idempotent).
    fn delete_secret(&self, key: &str) -> Result<(), KeychainError>;

    fn max_item_bytes(&self) -> usize {
        MAX_SECURE_ITEM_BYTES
    }
}

/// Reject values that do not fit in a single secure item.
pub(crate) fn check_item_size(key: &str, value: &str, max: usize) -> Result<(), KeychainError> {
    if value.len() > max {
        return Err(KeychainError::ItemTooLarge { key: key.to_string(), size: value.len(), max });
    }
    Ok(())
}

/// OS keychain provider
///
/// Every item is stored under `service_name` with the logical key as the
/// account name.
#[cfg(feature = "platform")]
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

#[cfg(feature = "platform")]
impl KeychainProvider {
    /// Create a new keychain provider for a specific service
    ///
    /// # Examples
    /// ```
    /// use forceauth_common::security::KeychainProvider;
    ///
    /// let keychain = KeychainProvider::new("forceauth");
    /// assert_eq!(keychain.service_name(), "forceauth");
    /// ```
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    /// Keychain service every item is filed under.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn create_entry(&self, account: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, account).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {}", e))
        })
    }
}

#[cfg(feature = "platform")]
impl SecureElement for KeychainProvider {
    fn get_secret(&self, key: &str) -> Result<Option<String>, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to retrieve secret for {}: {}",
                key, e
            ))),
        }
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        check_item_size(key, value, self.max_item_bytes())?;

        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        let entry = self.create_entry(key)?;
        entry.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {}: {}", key, e))
        })?;

        debug!(service = %self.service_name, key = %key, "Secret stored successfully");

        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        let entry = self.create_entry(key)?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {}: {}",
                key, e
            ))),
        }
    }
}

/// Keychain error types
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, not available, etc.)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    /// Value exceeds the per-item ceiling
    #[error("Keychain item '{key}' is {size} bytes, limit is {max}")]
    ItemTooLarge { key: String, size: usize, max: usize },
}
