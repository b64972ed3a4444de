//! Error types for Loupe.
//!
//! This module provides the [`enum@Error`] type returned by every
//! [`Catalog`](crate::Catalog) operation.

use loupe_vector::VectorError;
use thiserror::Error;

/// Errors that can occur when using a catalog.
///
/// The first four variants are the boundary taxonomy callers are expected to
/// handle; see [`is_recoverable`](Self::is_recoverable).
#[derive(Debug, Error)]
pub enum Error {
    /// A vector does not have the catalog's dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The catalog dimension.
        expected: usize,
        /// The dimension provided.
        actual: usize,
    },

    /// The catalog ID is unknown.
    #[error("catalog id not found: {0}")]
    NotFound(String),

    /// The index is being swapped and could not take the write.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// A rebuild did not complete; the previous index stays live.
    #[error("rebuild failed: {0}")]
    RebuildFailed(String),

    /// The caller passed something the catalog cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration error occurred.
    #[error("configuration error: {0}")]
    Config(String),

    /// A storage error occurred.
    #[error("storage error: {0}")]
    Storage(#[from] loupe_storage::StorageError),

    /// A vector operation error occurred.
    #[error("vector error: {0}")]
    Vector(VectorError),

    /// Internal bookkeeping is inconsistent. This is a bug, not bad input.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl Error {
    /// Returns `true` for the errors a caller can act on and retry: dimension
    /// mismatch, unknown ID, an index mid-swap, and a failed rebuild.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::NotFound(_)
                | Self::IndexUnavailable(_)
                | Self::RebuildFailed(_)
        )
    }

    /// Returns `true` if this error reports a logic fault.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a config error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invariant violation error.
    #[must_use]
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a lock poisoned error.
    #[must_use]
    pub fn lock_poisoned(msg: impl Into<String>) -> Self {
        Self::LockPoisoned(msg.into())
    }
}

impl From<VectorError> for Error {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorError::NotFound(id) => Self::NotFound(id),
            VectorError::InvalidId(msg) => Self::InvalidInput(msg),
            VectorError::InvalidValue { .. }
            | VectorError::ZeroVector { .. }
            | VectorError::InvalidK(_) => Self::InvalidInput(err.to_string()),
            VectorError::ConfigMismatch { .. } => Self::Config(err.to_string()),
            VectorError::Storage(inner) => Self::Storage(inner),
            VectorError::LockPoisoned => Self::LockPoisoned("vector index".to_string()),
            other => Self::Vector(other),
        }
    }
}

/// A specialized `Result` type for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::DimensionMismatch { expected: 4, actual: 3 }.is_recoverable());
        assert!(Error::NotFound("a".to_string()).is_recoverable());
        assert!(Error::IndexUnavailable("rebuilding".to_string()).is_recoverable());
        assert!(Error::RebuildFailed("alloc".to_string()).is_recoverable());

        assert!(!Error::config("bad").is_recoverable());
        assert!(!Error::invariant("two roots").is_recoverable());
        assert!(!Error::lock_poisoned("store").is_recoverable());
    }

    #[test]
    fn test_invariant_violation_is_distinct() {
        assert!(Error::invariant("orphan member").is_invariant_violation());
        assert!(!Error::invalid_input("empty id").is_invariant_violation());
    }

    #[test]
    fn test_vector_errors_map_onto_taxonomy() {
        let err: Error = VectorError::DimensionMismatch { expected: 4, actual: 2 }.into();
        assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2 }));

        let err: Error = VectorError::NotFound("ring-7".to_string()).into();
        assert!(matches!(err, Error::NotFound(ref id) if id == "ring-7"));

        let err: Error = VectorError::InvalidK(0).into();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err: Error = VectorError::ResourceExhausted("graph nodes".to_string()).into();
        assert!(matches!(err, Error::Vector(VectorError::ResourceExhausted(_))));
    }

    #[test]
    fn test_error_display() {
        let err = Error::config("low_cut above high_cut");
        assert_eq!(err.to_string(), "configuration error: low_cut above high_cut");

        let err = Error::DimensionMismatch { expected: 512, actual: 511 };
        assert_eq!(err.to_string(), "dimension mismatch: expected 512, got 511");
    }
}
