//! Security primitives
//!
//! Secure-element abstraction over the platform keychain.

pub mod keychain;

#[cfg(feature = "platform")]
pub use keychain::KeychainProvider;
pub use keychain::{KeychainError, SecureElement, MAX_SECURE_ITEM_BYTES};
