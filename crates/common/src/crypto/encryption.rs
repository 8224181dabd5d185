//! Cryptographic primitives for encrypting stored values.
//!
//! This module provides **low-level encryption primitives** using AES-256-GCM:
//!
//! - [`EncryptionService`]: AES-256-GCM encryption/decryption
//! - [`EncryptedData`]: Serializable encrypted data container
//! - Random key generation
//!
//! ## Module Relationships
//!
//! - **`crypto::encryption`** (this module): AES-256-GCM encryption primitives
//! - **`storage::encrypted`**: per-write keys kept in the secure element,
//!   ciphertext kept in general-purpose storage
//!
//! ## Usage
//!
//! ```rust
//! use forceauth_common::crypto::encryption::EncryptionService;
//!
//! let key = EncryptionService::generate_key();
//! let service = EncryptionService::new(key)?;
//!
//! let plaintext = b"sensitive data";
//! let encrypted = service.encrypt(plaintext)?;
//! let decrypted = service.decrypt(&encrypted)?;
//! assert_eq!(decrypted, plaintext);
//! # Ok::<(), forceauth_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

/// Length in bytes of an AES-256 key.
pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const ALGORITHM: &str = "AES-256-GCM";

/// Encrypted data container written to general-purpose storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-GCM encryption service bound to a single key.
pub struct EncryptionService {
    key: Zeroizing<Vec<u8>>,
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("key", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::internal(format!(
                "Encryption key must be exactly {KEY_LEN} bytes"
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| {
            CommonError::internal(format!("Failed to create encryption cipher: {e}"))
        })?;

        Ok(Self { key: Zeroizing::new(key), cipher })
    }

    /// Create a service from a base64-encoded key (as kept in the keychain).
    pub fn from_base64_key(encoded: &str) -> CommonResult<Self> {
        let key = BASE64
            .decode(encoded.trim())
            .map_err(|e| CommonError::internal(format!("Invalid base64 key: {e}")))?;
        Self::new(key)
    }

    /// Generate a random 32-byte symmetric key from the OS RNG.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Base64 form of the key, suitable for a small secure-element item.
    pub fn export_key(&self) -> String {
        BASE64.encode(self.key.as_slice())
    }

    /// Encrypt bytes into an `EncryptedData` payload.
    ///
    /// A fresh nonce is drawn for every call, so encrypting the same input
    /// twice yields different ciphertexts.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::internal(format!("Encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::internal(format!(
                "Unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        let nonce_array: [u8; NONCE_LEN] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::internal("Nonce must be exactly 12 bytes for AES-256-GCM".to_string())
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::internal(format!("Decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::serialization_format("base64", e.to_string()))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}
