//! Read access to vectors for scoring.

use std::collections::HashMap;
use std::sync::RwLockReadGuard;

use crate::error::VectorError;
use crate::types::CatalogId;

use super::entry::CatalogEntry;
use super::vector_store::StoreState;

/// Something the index can dereference catalog IDs through.
///
/// Implementations must return `None` for soft-deleted entries.
pub trait VectorSource {
    /// The vector of an active entry.
    fn vector(&self, id: &CatalogId) -> Option<&[f32]>;
}

impl<S: VectorSource + ?Sized> VectorSource for &S {
    fn vector(&self, id: &CatalogId) -> Option<&[f32]> {
        (**self).vector(id)
    }
}

/// A consistent read view of a [`VectorStore`](super::VectorStore).
///
/// Holds the store's read lock; writers wait until the view is dropped.
pub struct StoreView<'a> {
    pub(super) state: RwLockReadGuard<'a, StoreState>,
}

impl StoreView<'_> {
    /// Active entries in unspecified order.
    pub fn active(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.state.entries.values().filter(|e| e.active)
    }

    /// Look up an entry, active or not.
    #[must_use]
    pub fn entry(&self, id: &CatalogId) -> Option<&CatalogEntry> {
        self.state.entries.get(id)
    }
}

impl VectorSource for StoreView<'_> {
    fn vector(&self, id: &CatalogId) -> Option<&[f32]> {
        self.state.entries.get(id).filter(|e| e.active).map(|e| e.vector.as_slice())
    }
}

/// An owned copy of the active entries, in insertion order.
///
/// Rebuilds score against a snapshot so the store lock is not held while the
/// new graph is constructed.
#[derive(Debug, Default)]
pub struct EntrySnapshot {
    entries: Vec<CatalogEntry>,
    positions: HashMap<CatalogId, usize>,
}

impl EntrySnapshot {
    /// Index a list of entries. Inactive entries are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::ResourceExhausted`] if the lookup table cannot
    /// be allocated.
    pub fn new(mut entries: Vec<CatalogEntry>) -> Result<Self, VectorError> {
        entries.retain(|e| e.active);
        entries.sort_by_key(|e| e.inserted_at);

        let mut positions = HashMap::new();
        positions.try_reserve(entries.len())?;
        for (i, entry) in entries.iter().enumerate() {
            positions.insert(entry.id.clone(), i);
        }
        Ok(Self { entries, positions })
    }

    /// The snapshot's entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl VectorSource for EntrySnapshot {
    fn vector(&self, id: &CatalogId) -> Option<&[f32]> {
        self.positions.get(id).map(|&i| self.entries[i].vector.as_slice())
    }
}
