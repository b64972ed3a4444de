//! Catalog identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::VectorError;

/// An opaque, non-empty catalog identifier.
///
/// IDs are shared between the store, the index and duplicate groups, so the
/// string is reference counted and cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogId(Arc<str>);

impl CatalogId {
    /// Create an ID, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::InvalidId`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, VectorError> {
        let id = id.into();
        if id.is_empty() {
            return Err(VectorError::InvalidId("catalog id must not be empty".to_string()));
        }
        Ok(Self(Arc::from(id)))
    }

    /// The ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ID as raw bytes, used as the storage key.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Decode an ID from a storage key.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::Encoding`] for non-UTF-8 bytes and
    /// [`VectorError::InvalidId`] for an empty key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VectorError> {
        let id = std::str::from_utf8(bytes)
            .map_err(|e| VectorError::Encoding(format!("catalog id is not UTF-8: {e}")))?;
        Self::new(id)
    }
}

impl Borrow<str> for CatalogId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CatalogId {
    type Error = VectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CatalogId {
    type Error = VectorError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CatalogId> for String {
    fn from(id: CatalogId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CatalogId({:?})", &*self.0)
    }
}
