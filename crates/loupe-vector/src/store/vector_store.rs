//! Vector store implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use loupe_storage::backends::redb::tables::names::{CATALOG_ENTRIES, CATALOG_META};
use loupe_storage::{Cursor, StorageEngine, Transaction};
use tracing::debug;

use crate::distance::DistanceMetric;
use crate::error::VectorError;
use crate::types::{CatalogId, Embedding};

use super::entry::CatalogEntry;
use super::source::StoreView;

const META_DIMENSION: &[u8] = b"dimension";
const META_METRIC: &[u8] = b"metric";
const META_NEXT_INSERTED_AT: &[u8] = b"next_inserted_at";

/// In-memory mirror of the persisted entries.
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    pub(crate) entries: HashMap<CatalogId, CatalogEntry>,
    pub(crate) deleted: usize,
    pub(crate) next_inserted_at: u64,
}

/// The durable catalog: ID to vector, active flag and insertion counter.
///
/// Every mutation is written through to the storage engine in its own
/// transaction before the in-memory map changes, so a failed commit leaves
/// both sides untouched. Dimension and metric are persisted on first open and
/// checked on every later one.
pub struct VectorStore<E: StorageEngine> {
    engine: E,
    dimension: usize,
    metric: DistanceMetric,
    state: RwLock<StoreState>,
}

impl<E: StorageEngine> VectorStore<E> {
    /// Open the catalog held by `engine`, creating its metadata if absent.
    ///
    /// # Errors
    ///
    /// - [`VectorError::InvalidDimension`] if `dimension` is zero
    /// - [`VectorError::ConfigMismatch`] if the stored dimension or metric differs
    /// - storage and decoding errors while loading entries
    pub fn open(engine: E, dimension: usize, metric: DistanceMetric) -> Result<Self, VectorError> {
        if dimension == 0 {
            return Err(VectorError::InvalidDimension { expected: 1, actual: 0 });
        }

        let mut state = StoreState::default();
        let has_meta = {
            let tx = engine.begin_read()?;
            let stored_dimension = tx.get(CATALOG_META, META_DIMENSION)?;
            let stored_metric = tx.get(CATALOG_META, META_METRIC)?;
            let stored_next = tx.get(CATALOG_META, META_NEXT_INSERTED_AT)?;

            if let Some(bytes) = &stored_dimension {
                let stored = decode_u64(bytes, "dimension")?;
                if stored != dimension as u64 {
                    return Err(VectorError::ConfigMismatch {
                        field: "dimension",
                        stored: stored.to_string(),
                        requested: dimension.to_string(),
                    });
                }
            }
            if let Some(bytes) = &stored_metric {
                let stored = std::str::from_utf8(bytes)
                    .map_err(|e| VectorError::Encoding(format!("stored metric: {e}")))?;
                if stored != metric.as_str() {
                    return Err(VectorError::ConfigMismatch {
                        field: "metric",
                        stored: stored.to_string(),
                        requested: metric.to_string(),
                    });
                }
            }
            if let Some(bytes) = &stored_next {
                state.next_inserted_at = decode_u64(bytes, "next_inserted_at")?;
            }

            let mut cursor = tx.cursor(CATALOG_ENTRIES)?;
            while let Some((key, value)) = cursor.next()? {
                let entry = CatalogEntry::from_bytes(CatalogId::from_bytes(&key)?, &value)?;
                if entry.vector.dimension() != dimension {
                    return Err(VectorError::DimensionMismatch {
                        expected: dimension,
                        actual: entry.vector.dimension(),
                    });
                }
                if !entry.active {
                    state.deleted += 1;
                }
                state.next_inserted_at = state.next_inserted_at.max(entry.inserted_at + 1);
                state.entries.insert(entry.id.clone(), entry);
            }

            stored_dimension.is_some() && stored_metric.is_some()
        };

        if !has_meta {
            let mut tx = engine.begin_write()?;
            tx.put(CATALOG_META, META_DIMENSION, &(dimension as u64).to_le_bytes())?;
            tx.put(CATALOG_META, META_METRIC, metric.as_str().as_bytes())?;
            tx.put(CATALOG_META, META_NEXT_INSERTED_AT, &state.next_inserted_at.to_le_bytes())?;
            tx.commit()?;
        }

        debug!(
            entries = state.entries.len(),
            deleted = state.deleted,
            dimension,
            %metric,
            "opened vector store"
        );

        Ok(Self { engine, dimension, metric, state: RwLock::new(state) })
    }

    /// The catalog dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// The catalog metric.
    #[must_use]
    pub const fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Check that a vector can live in this catalog.
    ///
    /// # Errors
    ///
    /// [`VectorError::DimensionMismatch`] for the wrong length,
    /// [`VectorError::InvalidValue`] when the norm does not fit in an `f32`,
    /// and [`VectorError::ZeroVector`] for a zero vector under cosine.
    pub fn check_vector(&self, vector: &Embedding) -> Result<(), VectorError> {
        if vector.dimension() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }
        let norm = vector.l2_norm();
        if !norm.is_finite() {
            let (index, value) = vector
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
                .unwrap_or((0, norm));
            return Err(VectorError::InvalidValue {
                index,
                value,
                reason: "vector norm exceeds the f32 range",
            });
        }
        if self.metric.requires_direction() && (norm == 0.0 || vector.is_zero()) {
            return Err(VectorError::ZeroVector { metric: self.metric });
        }
        Ok(())
    }

    /// Insert or replace the entry for `id`.
    ///
    /// The new entry is active and gets the next insertion counter. Returns
    /// the entry it replaced so the caller can retire that entry's index node.
    ///
    /// # Errors
    ///
    /// Vector validation errors (see [`check_vector`](Self::check_vector)),
    /// storage errors, or [`VectorError::LockPoisoned`].
    pub fn insert(
        &self,
        id: &CatalogId,
        vector: Embedding,
    ) -> Result<Option<CatalogEntry>, VectorError> {
        self.check_vector(&vector)?;

        let mut state = self.state.write().map_err(|_| VectorError::LockPoisoned)?;
        let entry = CatalogEntry {
            id: id.clone(),
            vector,
            active: true,
            inserted_at: state.next_inserted_at,
        };

        let mut tx = self.engine.begin_write()?;
        tx.put(CATALOG_ENTRIES, id.as_bytes(), &entry.to_bytes())?;
        tx.put(CATALOG_META, META_NEXT_INSERTED_AT, &(entry.inserted_at + 1).to_le_bytes())?;
        tx.commit()?;

        state.next_inserted_at = entry.inserted_at + 1;
        let replaced = state.entries.insert(id.clone(), entry);
        if replaced.as_ref().is_some_and(|old| !old.active) {
            state.deleted -= 1;
        }
        Ok(replaced)
    }

    /// Get an entry, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the store lock is poisoned.
    pub fn get(&self, id: &CatalogId) -> Result<Option<CatalogEntry>, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(state.entries.get(id).cloned())
    }

    /// Whether `id` has an active entry.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the store lock is poisoned.
    pub fn is_active(&self, id: &CatalogId) -> Result<bool, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(state.entries.get(id).is_some_and(|e| e.active))
    }

    /// Mark an entry deleted.
    ///
    /// Returns `Ok(false)` if it already was.
    ///
    /// # Errors
    ///
    /// [`VectorError::NotFound`] for an unknown ID, storage errors, or
    /// [`VectorError::LockPoisoned`].
    pub fn soft_delete(&self, id: &CatalogId) -> Result<bool, VectorError> {
        let mut state = self.state.write().map_err(|_| VectorError::LockPoisoned)?;
        let Some(entry) = state.entries.get(id) else {
            return Err(VectorError::NotFound(id.to_string()));
        };
        if !entry.active {
            return Ok(false);
        }

        let mut tombstone = entry.clone();
        tombstone.active = false;
        let mut tx = self.engine.begin_write()?;
        tx.put(CATALOG_ENTRIES, id.as_bytes(), &tombstone.to_bytes())?;
        tx.commit()?;

        state.entries.insert(id.clone(), tombstone);
        state.deleted += 1;
        Ok(true)
    }

    /// Number of active entries.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the store lock is poisoned.
    pub fn active_count(&self) -> Result<usize, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(state.entries.len() - state.deleted)
    }

    /// Number of soft-deleted entries not yet purged.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the store lock is poisoned.
    pub fn deleted_count(&self) -> Result<usize, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(state.deleted)
    }

    /// Copies of all active entries, in insertion order.
    ///
    /// # Errors
    ///
    /// [`VectorError::ResourceExhausted`] if the copy cannot be allocated, or
    /// [`VectorError::LockPoisoned`].
    pub fn active_entries(&self) -> Result<Vec<CatalogEntry>, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        let mut entries = Vec::new();
        entries.try_reserve_exact(state.entries.len() - state.deleted)?;
        entries.extend(state.entries.values().filter(|e| e.active).cloned());
        entries.sort_by_key(|e| e.inserted_at);
        Ok(entries)
    }

    /// Physically remove every soft-deleted entry. Returns how many went.
    ///
    /// # Errors
    ///
    /// Storage errors, or [`VectorError::LockPoisoned`].
    pub fn purge_deleted(&self) -> Result<usize, VectorError> {
        let mut state = self.state.write().map_err(|_| VectorError::LockPoisoned)?;
        if state.deleted == 0 {
            return Ok(0);
        }

        let doomed: Vec<CatalogId> =
            state.entries.values().filter(|e| !e.active).map(|e| e.id.clone()).collect();
        let mut tx = self.engine.begin_write()?;
        for id in &doomed {
            tx.delete(CATALOG_ENTRIES, id.as_bytes())?;
        }
        tx.commit()?;

        for id in &doomed {
            state.entries.remove(id);
        }
        state.deleted = 0;
        debug!(purged = doomed.len(), "purged soft-deleted entries");
        Ok(doomed.len())
    }

    /// A read view for scoring. Blocks writers while held.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the store lock is poisoned.
    pub fn view(&self) -> Result<StoreView<'_>, VectorError> {
        let state = self.state.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(StoreView { state })
    }
}

fn decode_u64(bytes: &[u8], what: &str) -> Result<u64, VectorError> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| VectorError::Encoding(format!("{what} is {} bytes, expected 8", bytes.len())))?;
    Ok(u64::from_le_bytes(raw))
}
