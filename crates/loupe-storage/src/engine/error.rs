//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened or created.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A transaction could not be started, committed or aborted.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A write was attempted through a read-only transaction.
    #[error("write attempted in a read-only transaction")]
    ReadOnly,

    /// The backend reported an internal failure.
    #[error("internal storage error: {0}")]
    Internal(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Returns `true` if retrying the operation may succeed.
    ///
    /// Transaction conflicts and I/O hiccups are transient; a corrupt record
    /// or a misuse of a read-only transaction is not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transaction(_) | Self::Io(_))
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(StorageError::Transaction("busy".to_string()).is_transient());
        assert!(!StorageError::ReadOnly.is_transient());
        assert!(!StorageError::Serialization("truncated".to_string()).is_transient());
    }

    #[test]
    fn display() {
        let err = StorageError::Open("permission denied".to_string());
        assert_eq!(err.to_string(), "failed to open database: permission denied");
    }
}
