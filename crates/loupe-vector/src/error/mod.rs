//! Error types for the vector crate.

use thiserror::Error;

use crate::distance::DistanceMetric;

/// Errors that can occur in vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// A vector does not have the catalog's dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The expected dimension.
        expected: usize,
        /// The actual dimension.
        actual: usize,
    },

    /// Invalid dimension (e.g., zero).
    #[error("invalid dimension: expected at least {expected}, got {actual}")]
    InvalidDimension {
        /// The minimum expected dimension.
        expected: usize,
        /// The actual dimension.
        actual: usize,
    },

    /// Invalid value in a vector (NaN, Infinity).
    #[error("invalid value at index {index}: {value} - {reason}")]
    InvalidValue {
        /// The index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f32,
        /// The reason the value is invalid.
        reason: &'static str,
    },

    /// A zero vector was given where the metric needs a direction.
    #[error("zero vector has no direction under {metric} similarity")]
    ZeroVector {
        /// The metric that rejected the vector.
        metric: DistanceMetric,
    },

    /// Catalog IDs must be non-empty.
    #[error("invalid catalog id: {0}")]
    InvalidId(String),

    /// Top-k queries need `k >= 1`.
    #[error("invalid k: {0} (must be at least 1)")]
    InvalidK(usize),

    /// No entry exists for the catalog ID.
    #[error("catalog id not found: {0}")]
    NotFound(String),

    /// Persisted catalog metadata disagrees with the requested configuration.
    #[error("configuration mismatch for {field}: stored {stored}, requested {requested}")]
    ConfigMismatch {
        /// Which setting differs.
        field: &'static str,
        /// The persisted value.
        stored: String,
        /// The value asked for at open.
        requested: String,
    },

    /// An allocation for a snapshot or rebuild could not be satisfied.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Encoding/decoding error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] loupe_storage::StorageError),

    /// Lock poisoned by a panic in another thread.
    ///
    /// This error is unrecoverable - the structure must be dropped and rebuilt.
    #[error("index corrupted: lock poisoned due to prior panic in another thread")]
    LockPoisoned,
}

impl From<std::collections::TryReserveError> for VectorError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted(err.to_string())
    }
}
