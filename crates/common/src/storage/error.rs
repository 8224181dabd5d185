//! Storage error types
//!
//! Defines error types for the token storage layer, integrating with the
//! common error system.

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};
use crate::security::KeychainError;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keychain(#[from] KeychainError),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt storage file: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Common(#[from] crate::CommonError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Storage result type
pub type StorageResult<T> = Result<T, StorageError>;

impl ErrorClassification for StorageError {
    /// Retryable errors are transient backend conditions: a locked keychain,
    /// a busy file.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Keychain(KeychainError::AccessFailed(_)) => true,
            Self::Unavailable(_) | Self::Io(_) => true,
            Self::Common(common_err) => common_err.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Keychain(KeychainError::ItemTooLarge { .. }) => ErrorSeverity::Error,
            Self::Keychain(_) => ErrorSeverity::Critical,
            Self::Unavailable(_) => ErrorSeverity::Warning,
            Self::Corrupt(_) => ErrorSeverity::Critical,
            Self::Common(common_err) => common_err.severity(),
            Self::Io(_) => ErrorSeverity::Error,
            Self::SerdeJson(_) => ErrorSeverity::Error,
        }
    }
}

impl From<StorageError> for forceauth_domain::AuthError {
    fn from(err: StorageError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for storage::error.
    use super::*;

    #[test]
    fn test_keychain_errors_classified() {
        let locked = StorageError::from(KeychainError::AccessFailed("locked".into()));
        assert!(locked.is_retryable());
        assert!(locked.is_critical());

        let too_large =
            StorageError::from(KeychainError::ItemTooLarge { key: "k".into(), size: 3000, max: 2048 });
        assert!(!too_large.is_retryable());
        assert_eq!(too_large.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_converts_to_storage_unavailable() {
        let err = StorageError::Unavailable("keychain daemon not running".into());
        let auth: forceauth_domain::AuthError = err.into();
        assert_eq!(auth.code(), "storage_unavailable");
        assert!(auth.message().contains("keychain daemon not running"));
    }
}
