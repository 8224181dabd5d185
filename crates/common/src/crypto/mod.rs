//! Symmetric encryption primitives used by the encrypted token store.

pub mod encryption;

pub use encryption::{EncryptedData, EncryptionService};
