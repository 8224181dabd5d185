//! Common error types shared by the crypto and storage layers
//!
//! Module-specific errors compose with [`CommonError`] rather than duplicating
//! its variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum StorageError {
//!     #[error("Keychain error: {0}")]
//!     Keychain(#[from] KeychainError),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```
//!
//! Every error type implements [`ErrorClassification`] so callers can decide
//! on logging level and whether a retry makes sense without matching on
//! concrete variants.

use std::fmt;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Error variants that appear across modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Serialization or deserialization errors
    Serialization { message: String, format: String },

    /// Data persistence errors (file I/O)
    Persistence { message: String, operation: Option<String> },

    /// Internal errors that shouldn't normally occur (cipher failures,
    /// invariant violations)
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialization { message, format } => {
                write!(f, "Serialization error ({}): {}", format, message)
            }
            Self::Persistence { message, operation } => {
                if let Some(op) = operation {
                    write!(f, "Persistence error during '{}': {}", op, message)
                } else {
                    write!(f, "Persistence error: {}", message)
                }
            }
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for CommonError {}

impl CommonError {
    /// Encoding or decoding failure in `format`.
    pub fn serialization_format<S: Into<String>, F: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: format.into() }
    }

    /// File or store write failure.
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into(), operation: None }
    }

    /// Failure during a named persistence step.
    pub fn persistence_op<S: Into<String>, O: Into<String>>(operation: O, message: S) -> Self {
        Self::Persistence { message: message.into(), operation: Some(operation.into()) }
    }

    /// Failure that indicates a bug or corrupted key material.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        // A failed write may succeed once the disk or lock frees up
        matches!(self, Self::Persistence { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Persistence { .. } => ErrorSeverity::Warning,
            Self::Serialization { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Whether repeating the same operation may succeed
    fn is_retryable(&self) -> bool;

    /// How loudly the error should be reported
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error signals a security or integrity problem
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// Integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// Standard conversions from common error types
impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use super::*;

    #[test]
    fn display_with_and_without_context() {
        assert_eq!(
            CommonError::persistence_op("write", "disk full").to_string(),
            "Persistence error during 'write': disk full"
        );
        assert_eq!(CommonError::persistence("disk full").to_string(), "Persistence error: disk full");
        assert_eq!(
            CommonError::serialization_format("JSON", "eof").to_string(),
            "Serialization error (JSON): eof"
        );
    }

    #[test]
    fn classification() {
        assert!(CommonError::persistence("x").is_retryable());
        assert!(!CommonError::internal("x").is_retryable());
        assert!(CommonError::internal("x").is_critical());
        assert_eq!(CommonError::persistence("x").severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn converts_from_io_and_json() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(CommonError::from(io), CommonError::Persistence { .. }));

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(CommonError::from(json), CommonError::Serialization { .. }));
    }
}
