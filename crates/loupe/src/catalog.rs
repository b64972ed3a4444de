//! Main catalog interface.
//!
//! This module provides [`Catalog`], the entry point for ingesting
//! embeddings, querying neighbors and reading duplicate groups.
//!
//! # Examples
//!
//! ```ignore
//! use loupe::{Catalog, CatalogConfig, DistanceMetric};
//!
//! let config = CatalogConfig::new(4, DistanceMetric::Cosine).with_dedup_threshold(0.95);
//! let catalog = Catalog::open("catalog.loupe", config)?;
//!
//! let outcome = catalog.ingest("ring-001", vec![1.0, 0.0, 0.0, 0.0])?;
//! let outcome = catalog.ingest("ring-001-copy", vec![0.99, 0.14, 0.0, 0.0])?;
//! assert!(outcome.duplicate_of.is_some());
//!
//! let hits = catalog.query(&[1.0, 0.0, 0.0, 0.0], 5)?;
//! ```

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use std::thread;
use std::time::Instant;

use loupe_storage::backends::RedbEngine;
use loupe_storage::StorageEngine;
use loupe_vector::index::{IndexStats, SimilarityIndex};
use loupe_vector::ops::ExactKnn;
use loupe_vector::store::{CatalogEntry, EntrySnapshot, VectorSource, VectorStore};
use loupe_vector::{CatalogId, Embedding, NeighborResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::confidence::{ConfidenceBand, ConfidenceClassifier};
use crate::config::CatalogConfig;
use crate::dedup::{DuplicateClusterer, DuplicateGroup};
use crate::error::{Error, Result};
use crate::maintainer::{fragmentation_ratio, IndexMaintainer};
use crate::metrics::{CatalogMetrics, MetricsSnapshot};

/// Result of [`Catalog::ingest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    /// `false` when the ID was already active with an identical vector.
    pub accepted: bool,
    /// The entry's duplicate group, when it has two or more members.
    pub duplicate_of: Option<DuplicateGroup>,
    /// Band of the best neighbor score, `None` without neighbors.
    pub confidence: Option<ConfidenceBand>,
}

/// Result of [`Catalog::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemoveOutcome {
    /// `false` if the entry was already removed.
    pub removed: bool,
}

/// Result of [`Catalog::rebuild`] and [`Catalog::maintain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebuildOutcome {
    /// `false` if no rebuild ran, for example because one was in progress.
    pub triggered: bool,
    /// Soft-deleted entries physically removed.
    pub purged: usize,
}

impl RebuildOutcome {
    const SKIPPED: Self = Self { triggered: false, purged: 0 };
}

/// Per-query settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    /// Number of neighbors wanted.
    pub k: usize,
    /// Beam width override; the configured `ef_search` when `None`.
    pub ef_search: Option<usize>,
    /// Drop results scoring below this.
    pub min_score: Option<f32>,
}

impl QueryOptions {
    /// Top-`k` with default search settings.
    #[must_use]
    pub const fn new(k: usize) -> Self {
        Self { k, ef_search: None, min_score: None }
    }

    /// Set the beam width for this query.
    #[must_use]
    pub const fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = Some(ef);
        self
    }

    /// Only return results scoring at least `min_score`.
    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// Point-in-time view of the catalog's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    /// Active entries.
    pub active: usize,
    /// Soft-deleted entries awaiting a rebuild.
    pub deleted: usize,
    /// `deleted / (active + deleted)`.
    pub fragmentation: f64,
    /// Graph shape.
    pub index: IndexStats,
    /// Duplicate groups, singletons included.
    pub groups: usize,
    /// Groups with two or more members.
    pub duplicate_groups: usize,
    /// A rebuild is running.
    pub rebuilding: bool,
    /// A failed rebuild is waiting for the next maintenance pass.
    pub rebuild_pending: bool,
}

struct Inner<E: StorageEngine> {
    config: CatalogConfig,
    store: VectorStore<E>,
    index: RwLock<Arc<SimilarityIndex>>,
    groups: RwLock<DuplicateClusterer>,
    classifier: ConfidenceClassifier,
    maintainer: IndexMaintainer,
    metrics: CatalogMetrics,
    /// Serializes every mutation of store, index and groups.
    writer: Mutex<()>,
    /// Grouped entries that missed their index insert, linked on rebuild.
    unlinked: Mutex<Vec<CatalogId>>,
}

/// A similarity catalog: vector store, proximity index and duplicate groups.
///
/// Cloning is cheap and every clone shares the same state. Reads run
/// concurrently; writes are serialized. A rebuild builds the new index off
/// to the side and swaps it in, so queries never wait for one.
pub struct Catalog<E: StorageEngine = RedbEngine> {
    inner: Arc<Inner<E>>,
}

impl<E: StorageEngine> Clone for Catalog<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Catalog<RedbEngine> {
    /// Open or create a catalog file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the file cannot be
    /// opened, or it was created with a different dimension or metric.
    pub fn open(path: impl AsRef<Path>, config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let engine = RedbEngine::open_with_config(path, config.redb_config())?;
        Self::with_engine(engine, config)
    }

    /// Create a catalog that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn in_memory(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        Self::with_engine(RedbEngine::in_memory()?, config)
    }
}

impl<E: StorageEngine + 'static> Catalog<E> {
    /// Open a catalog over any storage engine.
    ///
    /// Persisted entries are loaded and replayed in insertion order: the
    /// graph is rebuilt and duplicate groups are recomputed exactly as the
    /// original ingests formed them.
    ///
    /// # Errors
    ///
    /// Configuration, storage and decoding errors.
    pub fn with_engine(engine: E, config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let classifier = ConfidenceClassifier::new(config.confidence)?;
        let store = VectorStore::open(engine, config.dimension, config.metric)?;

        let start = Instant::now();
        let snapshot = EntrySnapshot::new(store.active_entries()?)?;
        let index = SimilarityIndex::new(config.dimension, config.metric, config.index.clone());
        let mut groups = DuplicateClusterer::new();
        for entry in snapshot.entries() {
            index.insert(&entry.id, entry.inserted_at, &snapshot)?;
            groups.insert(&entry.id);
            let neighbors =
                neighbors_excluding(&index, &entry.id, &entry.vector, config.dedup.k, &snapshot)?;
            link_duplicates(&mut groups, &entry.id, &neighbors, config.dedup.threshold)?;
        }
        groups.check_invariants()?;

        info!(
            entries = snapshot.len(),
            deleted = store.deleted_count()?,
            groups = groups.group_count(),
            elapsed_ms = start.elapsed().as_millis(),
            "catalog opened"
        );

        let maintainer = IndexMaintainer::new(config.maintenance);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                index: RwLock::new(Arc::new(index)),
                groups: RwLock::new(groups),
                classifier,
                maintainer,
                metrics: CatalogMetrics::new(),
                writer: Mutex::new(()),
                unlinked: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The configuration the catalog was opened with.
    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    /// Add or replace an entry and group it with its near-duplicates.
    ///
    /// Re-ingesting an active ID with an identical vector changes nothing
    /// and reports `accepted: false`. Any other re-ingest replaces the entry:
    /// it leaves its old group and is grouped afresh from its new neighbors.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for an empty ID, non-finite components, a
    ///   norm outside the `f32` range, or a zero vector under cosine
    /// - [`Error::DimensionMismatch`] for the wrong length
    /// - [`Error::IndexUnavailable`] if a rebuild outlasted every retry
    pub fn ingest(&self, id: &str, vector: Vec<f32>) -> Result<IngestOutcome> {
        let parsed = CatalogId::new(id)
            .map_err(Error::from)
            .and_then(|id| Ok((id, Embedding::new(vector)?)))
            .and_then(|(id, vector)| {
                self.inner.store.check_vector(&vector)?;
                Ok((id, vector))
            });
        let (id, vector) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                self.inner.metrics.record_rejected();
                return Err(err);
            }
        };

        let outcome = self.inner.maintainer.retry(|| self.ingest_entry(&id, &vector))?;
        self.inner.metrics.record_ingest(outcome.accepted, outcome.duplicate_of.is_some());
        Ok(outcome)
    }

    /// Ingest a batch, one result per item in order. A failed item does not
    /// stop the batch.
    pub fn ingest_many<I, S>(&self, items: I) -> Vec<Result<IngestOutcome>>
    where
        I: IntoIterator<Item = (S, Vec<f32>)>,
        S: AsRef<str>,
    {
        items.into_iter().map(|(id, vector)| self.ingest(id.as_ref(), vector)).collect()
    }

    fn ingest_entry(&self, id: &CatalogId, vector: &Embedding) -> Result<IngestOutcome> {
        let inner = &*self.inner;
        let _writer = self.lock_writer()?;
        let index = self.current_index()?;

        let existing = inner.store.get(id)?;
        if existing.as_ref().is_some_and(|e| e.active && e.vector == *vector) {
            let neighbors = {
                let view = inner.store.view()?;
                neighbors_excluding(&index, id, vector, inner.config.dedup.k, &view)?
            };
            debug!(%id, "ingest unchanged");
            return Ok(IngestOutcome {
                accepted: false,
                duplicate_of: self.read_groups()?.group_of(id).filter(DuplicateGroup::is_duplicate),
                confidence: neighbors.first().map(|n| inner.classifier.classify(n.score)),
            });
        }

        inner.store.insert(id, vector.clone())?;
        let entry =
            inner.store.get(id)?.ok_or_else(|| Error::invariant(format!("{id} vanished on insert")))?;

        let neighbors = {
            let view = inner.store.view()?;
            index
                .insert(id, entry.inserted_at, &view)
                .map_err(Error::from)
                .and_then(|()| neighbors_excluding(&index, id, vector, inner.config.dedup.k, &view))
        };

        // The store write has committed, so the entry is grouped either way.
        let mut groups = self.write_groups()?;
        if existing.is_some_and(|e| e.active) {
            groups.remove(id);
        }
        groups.insert(id);
        let neighbors = match neighbors {
            Ok(neighbors) => neighbors,
            Err(err) => {
                drop(groups);
                warn!(%id, error = %err, "index insert failed; scheduling rebuild");
                self.lock_unlinked()?.push(id.clone());
                inner.maintainer.mark_pending();
                return Err(err);
            }
        };
        link_duplicates(&mut groups, id, &neighbors, inner.config.dedup.threshold)?;
        let duplicate_of = groups.group_of(id).filter(DuplicateGroup::is_duplicate);
        drop(groups);

        let confidence = neighbors.first().map(|n| inner.classifier.classify(n.score));
        debug!(
            %id,
            inserted_at = entry.inserted_at,
            group_size = duplicate_of.as_ref().map_or(1, DuplicateGroup::len),
            best_score = neighbors.first().map(|n| n.score),
            "ingested"
        );
        Ok(IngestOutcome { accepted: true, duplicate_of, confidence })
    }

    /// Top-`k` neighbors of `vector`, best first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for `k == 0` or a malformed vector, and
    /// [`Error::DimensionMismatch`] for the wrong length.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborResult>> {
        self.query_with(vector, QueryOptions::new(k))
    }

    /// Neighbors of `vector` with per-query settings.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_with(&self, vector: &[f32], options: QueryOptions) -> Result<Vec<NeighborResult>> {
        let start = Instant::now();
        let query = Embedding::new(vector.to_vec())?;
        self.inner.store.check_vector(&query)?;
        let index = self.current_index()?;
        let mut results = {
            let view = self.inner.store.view()?;
            index.query_with_ef(&query, options.k, options.ef_search, &view)?
        };
        if let Some(min_score) = options.min_score {
            results.retain(|r| r.score >= min_score);
        }
        self.inner.metrics.record_query(start.elapsed());
        Ok(results)
    }

    /// Exact top-`k` by scanning every active entry.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub fn query_exact(&self, vector: &[f32], k: usize) -> Result<Vec<NeighborResult>> {
        let query = Embedding::new(vector.to_vec())?;
        self.inner.store.check_vector(&query)?;
        let view = self.inner.store.view()?;
        Ok(ExactKnn::search(&query, k, self.inner.config.metric, view.active())?)
    }

    /// Soft-delete an entry. It disappears from queries and groups at once
    /// and is purged by the next rebuild.
    ///
    /// May run an automatic rebuild when the removal pushes fragmentation
    /// over the threshold; a failure there is logged and left pending, not
    /// returned.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an ID that was never ingested.
    pub fn remove(&self, id: &str) -> Result<RemoveOutcome> {
        let id = CatalogId::new(id)?;
        let outcome = self.inner.maintainer.retry(|| self.remove_entry(&id))?;
        if outcome.removed {
            self.inner.metrics.record_removal();
            self.rebuild_if_fragmented()?;
        }
        Ok(outcome)
    }

    fn remove_entry(&self, id: &CatalogId) -> Result<RemoveOutcome> {
        let inner = &*self.inner;
        let _writer = self.lock_writer()?;
        let Some(entry) = inner.store.get(id)? else {
            return Err(Error::NotFound(id.to_string()));
        };
        if !entry.active {
            return Ok(RemoveOutcome { removed: false });
        }

        let index = self.current_index()?;
        index.remove(id)?;
        if let Err(err) = inner.store.soft_delete(id) {
            let view = inner.store.view()?;
            if let Err(relink) = index.insert(id, entry.inserted_at, &view) {
                warn!(%id, error = %relink, "could not relink entry after failed delete");
                inner.maintainer.mark_pending();
            }
            return Err(err.into());
        }
        self.write_groups()?.remove(id);

        debug!(%id, "removed");
        Ok(RemoveOutcome { removed: true })
    }

    fn rebuild_if_fragmented(&self) -> Result<()> {
        let (active, deleted) = self.counts()?;
        let fragmentation = fragmentation_ratio(active, deleted);
        self.inner.metrics.update_store(active, deleted, fragmentation);
        if !self.inner.maintainer.is_fragmented(active, deleted) {
            return Ok(());
        }

        if self.inner.config.maintenance.background_rebuild {
            let catalog = self.clone();
            let spawned = thread::Builder::new().name("loupe-rebuild".to_string()).spawn(move || {
                if let Err(err) = catalog.rebuild() {
                    warn!(error = %err, "background rebuild failed");
                }
            });
            if let Err(err) = spawned {
                warn!(error = %err, "cannot spawn rebuild thread; will retry on next maintain");
                self.inner.maintainer.mark_pending();
            }
        } else if let Err(err) = self.rebuild() {
            warn!(error = %err, fragmentation, "automatic rebuild failed; retry pending");
        }
        Ok(())
    }

    /// Rebuild the index from the active entries and purge soft-deleted
    /// ones.
    ///
    /// Entries are inserted in their original order with the configured
    /// seed, so rebuilding the same catalog twice yields the same graph.
    /// Returns `triggered: false` if another rebuild is already running.
    ///
    /// # Errors
    ///
    /// [`Error::RebuildFailed`] if the new index could not be built; the old
    /// one stays live and a retry is scheduled.
    pub fn rebuild(&self) -> Result<RebuildOutcome> {
        let result = self.inner.maintainer.run(|| self.rebuild_locked());
        match result {
            Ok(Some(purged)) => Ok(RebuildOutcome { triggered: true, purged }),
            Ok(None) => {
                debug!("rebuild already in progress");
                Ok(RebuildOutcome::SKIPPED)
            }
            Err(err) => {
                self.inner.metrics.record_rebuild_failure();
                Err(err)
            }
        }
    }

    fn rebuild_locked(&self) -> Result<usize> {
        let inner = &*self.inner;
        let _writer = inner.writer.lock().map_err(|_| Error::lock_poisoned("catalog writer"))?;
        let start = Instant::now();
        let (active, deleted) = self.counts()?;
        info!(active, deleted, "index rebuild started");

        let snapshot = EntrySnapshot::new(inner.store.active_entries()?)?;
        let index = SimilarityIndex::build(
            inner.config.dimension,
            inner.config.metric,
            inner.config.index.clone(),
            snapshot.entries().iter().map(|e| (&e.id, e.inserted_at)),
            &snapshot,
        )?;
        let purged = inner.store.purge_deleted()?;
        let index = Arc::new(index);
        *inner.index.write().map_err(|_| Error::lock_poisoned("index reference"))? =
            Arc::clone(&index);
        self.relink(&index)?;

        let elapsed = start.elapsed();
        inner.metrics.record_rebuild(elapsed, purged);
        inner.metrics.update_store(active, 0, 0.0);
        info!(
            live = snapshot.len(),
            purged,
            elapsed_ms = elapsed.as_millis(),
            "index rebuild finished"
        );
        Ok(purged)
    }

    /// Run any maintenance that is due: a rebuild when fragmentation exceeds
    /// the threshold or an earlier rebuild failed.
    ///
    /// # Errors
    ///
    /// See [`rebuild`](Self::rebuild).
    pub fn maintain(&self) -> Result<RebuildOutcome> {
        let (active, deleted) = self.counts()?;
        if self.inner.maintainer.rebuild_due(active, deleted) {
            self.rebuild()
        } else {
            Ok(RebuildOutcome::SKIPPED)
        }
    }

    /// Recompute every duplicate group from scratch over the active entries.
    ///
    /// Unlike ingest, which only links a new entry to its neighbors at that
    /// moment, this links every pair the index currently finds above the
    /// threshold. Removals can therefore split groups here. Returns the
    /// number of groups with two or more members.
    ///
    /// # Errors
    ///
    /// Storage, index and invariant errors; the previous groups are kept.
    pub fn regroup(&self) -> Result<usize> {
        let inner = &*self.inner;
        let _writer = self.lock_writer()?;
        let index = self.current_index()?;

        let mut groups = DuplicateClusterer::new();
        {
            let view = inner.store.view()?;
            let mut active: Vec<&CatalogEntry> = view.active().collect();
            active.sort_by_key(|e| e.inserted_at);
            for entry in &active {
                groups.insert(&entry.id);
            }
            for entry in &active {
                let neighbors = neighbors_excluding(
                    &index,
                    &entry.id,
                    &entry.vector,
                    inner.config.dedup.k,
                    &view,
                )?;
                link_duplicates(&mut groups, &entry.id, &neighbors, inner.config.dedup.threshold)?;
            }
        }
        groups.check_invariants()?;

        let duplicates = groups.duplicate_groups().len();
        *self.write_groups()? = groups;
        info!(duplicates, "duplicate groups recomputed");
        Ok(duplicates)
    }

    /// The stored entry for `id`, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty ID.
    pub fn get(&self, id: &str) -> Result<Option<CatalogEntry>> {
        let id = CatalogId::new(id)?;
        Ok(self.inner.store.get(&id)?)
    }

    /// The group of `id`; `None` for unknown or removed IDs.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty ID.
    pub fn group_of(&self, id: &str) -> Result<Option<DuplicateGroup>> {
        let id = CatalogId::new(id)?;
        Ok(self.read_groups()?.group_of(&id))
    }

    /// Groups with two or more members.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the group lock is poisoned.
    pub fn duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        Ok(self.read_groups()?.duplicate_groups())
    }

    /// Every group, singletons included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the group lock is poisoned.
    pub fn all_groups(&self) -> Result<Vec<DuplicateGroup>> {
        Ok(self.read_groups()?.all_groups())
    }

    /// Confidence band of a score under the configured cuts.
    #[must_use]
    pub fn classify(&self, score: f32) -> ConfidenceBand {
        self.inner.classifier.classify(score)
    }

    /// Counts and graph shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if an internal lock is poisoned.
    pub fn stats(&self) -> Result<CatalogStats> {
        let (active, deleted) = self.counts()?;
        let index = self.current_index()?.stats()?;
        let groups = self.read_groups()?;
        Ok(CatalogStats {
            active,
            deleted,
            fragmentation: fragmentation_ratio(active, deleted),
            index,
            groups: groups.group_count(),
            duplicate_groups: groups.duplicate_groups().len(),
            rebuilding: self.inner.maintainer.is_rebuilding(),
            rebuild_pending: self.inner.maintainer.is_pending(),
        })
    }

    /// A snapshot of the catalog metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Verify that groups partition the active entries and that the index
    /// holds exactly the active entries.
    ///
    /// # Errors
    ///
    /// [`Error::InvariantViolation`] naming the first inconsistency.
    pub fn check_invariants(&self) -> Result<()> {
        let _writer = self.lock_writer()?;
        let groups = self.read_groups()?;
        groups.check_invariants()?;

        let index = self.current_index()?;
        let view = self.inner.store.view()?;
        let mut active = 0;
        for entry in view.active() {
            active += 1;
            if !groups.contains(&entry.id) {
                return Err(Error::invariant(format!("{} is active but in no group", entry.id)));
            }
            if !index.contains(&entry.id)? {
                return Err(Error::invariant(format!("{} is active but not indexed", entry.id)));
            }
        }
        if groups.len() != active {
            return Err(Error::invariant(format!(
                "{} grouped ids for {active} active entries",
                groups.len()
            )));
        }
        if index.live_len()? != active {
            return Err(Error::invariant(format!(
                "{} live index nodes for {active} active entries",
                index.live_len()?
            )));
        }
        Ok(())
    }

    /// Link entries whose index insert failed to their neighbors in the
    /// rebuilt `index`. Runs under the writer lock; on failure the IDs stay
    /// queued for the next rebuild.
    fn relink(&self, index: &SimilarityIndex) -> Result<()> {
        let pending = std::mem::take(&mut *self.lock_unlinked()?);
        if pending.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.link_entries(index, &pending) {
            self.lock_unlinked()?.extend(pending);
            return Err(err);
        }
        info!(relinked = pending.len(), "entries linked after rebuild");
        Ok(())
    }

    fn link_entries(&self, index: &SimilarityIndex, ids: &[CatalogId]) -> Result<()> {
        let inner = &*self.inner;
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            entries.extend(inner.store.get(id)?.filter(|e| e.active));
        }

        let view = inner.store.view()?;
        let mut groups = self.write_groups()?;
        for entry in &entries {
            groups.insert(&entry.id);
            let neighbors =
                neighbors_excluding(index, &entry.id, &entry.vector, inner.config.dedup.k, &view)?;
            link_duplicates(&mut groups, &entry.id, &neighbors, inner.config.dedup.threshold)?;
        }
        Ok(())
    }

    fn lock_unlinked(&self) -> Result<MutexGuard<'_, Vec<CatalogId>>> {
        self.inner.unlinked.lock().map_err(|_| Error::lock_poisoned("unlinked ids"))
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        match self.inner.writer.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) if self.inner.maintainer.is_rebuilding() => {
                Err(Error::IndexUnavailable("index rebuild in progress".to_string()))
            }
            Err(TryLockError::WouldBlock) => {
                self.inner.writer.lock().map_err(|_| Error::lock_poisoned("catalog writer"))
            }
            Err(TryLockError::Poisoned(_)) => Err(Error::lock_poisoned("catalog writer")),
        }
    }

    fn current_index(&self) -> Result<Arc<SimilarityIndex>> {
        let index = self.inner.index.read().map_err(|_| Error::lock_poisoned("index reference"))?;
        Ok(Arc::clone(&index))
    }

    fn read_groups(&self) -> Result<std::sync::RwLockReadGuard<'_, DuplicateClusterer>> {
        self.inner.groups.read().map_err(|_| Error::lock_poisoned("duplicate groups"))
    }

    fn write_groups(&self) -> Result<std::sync::RwLockWriteGuard<'_, DuplicateClusterer>> {
        self.inner.groups.write().map_err(|_| Error::lock_poisoned("duplicate groups"))
    }

    fn counts(&self) -> Result<(usize, usize)> {
        Ok((self.inner.store.active_count()?, self.inner.store.deleted_count()?))
    }
}

impl<E: StorageEngine> std::fmt::Debug for Catalog<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("dimension", &self.inner.config.dimension)
            .field("metric", &self.inner.config.metric)
            .finish_non_exhaustive()
    }
}

/// Up to `k` neighbors of `vector`, `id` itself left out.
fn neighbors_excluding<S: VectorSource + ?Sized>(
    index: &SimilarityIndex,
    id: &CatalogId,
    vector: &Embedding,
    k: usize,
    source: &S,
) -> Result<Vec<NeighborResult>> {
    let mut neighbors = index.query(vector, k.saturating_add(1), source)?;
    neighbors.retain(|n| n.id != *id);
    neighbors.truncate(k);
    Ok(neighbors)
}

fn link_duplicates(
    groups: &mut DuplicateClusterer,
    id: &CatalogId,
    neighbors: &[NeighborResult],
    threshold: f32,
) -> Result<()> {
    for neighbor in neighbors.iter().filter(|n| n.score >= threshold) {
        groups.insert(&neighbor.id);
        groups.union(id, &neighbor.id)?;
    }
    Ok(())
}
