//! Error types for DDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] ddb_storage::StorageError),

    /// JSON codec error.
    #[error("codec error: {0}")]
    Codec(#[from] ddb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store file is not a well-formed array of records.
    #[error("storage corruption at offset {offset}: {message}")]
    StorageCorruption {
        /// Byte offset where the problem was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// No active document carries the identifier.
    #[error("document not found: {id}")]
    NotFound {
        /// The identifier that was searched for.
        id: String,
    },

    /// A rendered document would exceed the configured size.
    #[error("document too large: needs up to {needed} bytes, limit is {limit}")]
    TooLarge {
        /// Upper bound of the rendered size.
        needed: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The input is not an acceptable document.
    #[error("malformed input: {message}")]
    MalformedInput {
        /// Description of the problem.
        message: String,
    },

    /// Every identifier up to `u64::MAX` has been issued.
    #[error("identifier space exhausted")]
    IdentifiersExhausted,

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,
}

impl CoreError {
    /// Creates a storage corruption error.
    pub fn storage_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::StorageCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates a malformed input error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    /// Returns true if the error leaves the store untouched and is caused by
    /// the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::TooLarge { .. }
                | Self::MalformedInput { .. }
                | Self::Codec(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        let err = CoreError::storage_corruption(7, "unexpected byte");
        assert!(matches!(err, CoreError::StorageCorruption { offset: 7, .. }));
        assert_eq!(
            err.to_string(),
            "storage corruption at offset 7: unexpected byte"
        );
        assert_eq!(
            CoreError::not_found("abc").to_string(),
            "document not found: abc"
        );
    }

    #[test]
    fn classification() {
        assert!(CoreError::not_found("x").is_client_error());
        assert!(CoreError::malformed("x").is_client_error());
        assert!(!CoreError::storage_corruption(0, "x").is_client_error());
        assert!(!CoreError::StoreLocked.is_client_error());
        assert!(!CoreError::IdentifiersExhausted.is_client_error());
    }

    #[test]
    fn codec_errors_convert() {
        let err: CoreError = ddb_codec::CodecError::TooLarge {
            needed: 10,
            limit: 5,
        }
        .into();
        assert!(matches!(err, CoreError::Codec(_)));
    }
}
