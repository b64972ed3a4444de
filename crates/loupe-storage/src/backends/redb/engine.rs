//! The Redb-backed [`StorageEngine`].

use std::path::Path;

use redb::Database;

use crate::engine::{StorageEngine, StorageError};

use super::transaction::RedbTransaction;

/// Tuning options for [`RedbEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedbConfig {
    /// Page cache size in bytes. `None` keeps Redb's default.
    pub cache_size: Option<usize>,
}

impl RedbConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }
}

/// A storage engine backed by a Redb database file (or memory).
pub struct RedbEngine {
    db: Database,
}

impl RedbEngine {
    /// Open or create a database file with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Open or create a database file with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or created.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: RedbConfig,
    ) -> Result<Self, StorageError> {
        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }

        let db = builder.create(path.as_ref()).map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self { db })
    }

    /// Create a database that lives only as long as the engine.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RedbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbEngine").finish_non_exhaustive()
    }
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::new_read(tx))
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::new_write(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Transaction;

    #[test]
    fn in_memory_starts_empty() {
        let engine = RedbEngine::in_memory().expect("failed to create in-memory db");
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get("catalog_meta", b"dimension").expect("failed to get"), None);
    }

    #[test]
    fn config_builder() {
        let config = RedbConfig::new().cache_size(8 * 1024 * 1024);
        assert_eq!(config.cache_size, Some(8 * 1024 * 1024));
        assert_eq!(RedbConfig::default().cache_size, None);
    }

    #[test]
    fn committed_writes_are_visible() {
        let engine = RedbEngine::in_memory().expect("failed to create in-memory db");

        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put("catalog_meta", b"dimension", b"\x04\x00\x00\x00").expect("failed to put");
        tx.commit().expect("failed to commit");

        let tx = engine.begin_read().expect("failed to begin read");
        let value = tx.get("catalog_meta", b"dimension").expect("failed to get");
        assert_eq!(value, Some(b"\x04\x00\x00\x00".to_vec()));
    }

    #[test]
    fn uncommitted_writes_are_discarded() {
        let engine = RedbEngine::in_memory().expect("failed to create in-memory db");

        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.put("catalog_meta", b"metric", b"cosine").expect("failed to put");
        drop(tx);

        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.get("catalog_meta", b"metric").expect("failed to get"), None);
    }
}
