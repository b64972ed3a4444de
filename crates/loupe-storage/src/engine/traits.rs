//! Core storage engine traits.
//!
//! - [`StorageEngine`] hands out transactions.
//! - [`Transaction`] reads and writes logical tables atomically.
//! - [`Cursor`] walks a logical table in key order.

use std::sync::Arc;

use super::StorageError;

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that return a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// A storage engine that provides transactional key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`); the catalog shares a
/// single engine between readers and the writer.
///
/// # Example
///
/// ```ignore
/// use loupe_storage::{StorageEngine, StorageError, Transaction};
///
/// fn example<E: StorageEngine>(engine: &E) -> Result<(), StorageError> {
///     let mut tx = engine.begin_write()?;
///     tx.put("catalog_meta", b"dimension", &512u32.to_le_bytes())?;
///     tx.commit()?;
///
///     let tx = engine.begin_read()?;
///     let value = tx.get("catalog_meta", b"dimension")?;
///     Ok(())
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction over a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;
}

/// A transaction that provides ACID key-value operations.
///
/// Write transactions must be committed explicitly; dropping one without
/// committing discards its changes.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a logical table.
    ///
    /// A table that has never been written to reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the backend read fails.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or replace a key-value pair in a logical table.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read transaction, or
    /// [`StorageError::Internal`] if the write fails.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key from a logical table.
    ///
    /// Returns `Ok(true)` if the key existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] on a read transaction, or
    /// [`StorageError::Internal`] if the delete fails.
    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Create a cursor over every key-value pair of a logical table.
    ///
    /// The cursor starts before the first key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the backend cannot be read.
    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError>;

    /// Commit the transaction, making all changes durable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the commit fails.
    fn commit(self) -> Result<(), StorageError>;
}

/// A forward cursor over key-value pairs in key order.
///
/// ```ignore
/// let mut cursor = tx.cursor("catalog_entries")?;
/// while let Some((key, value)) = cursor.next()? {
///     // ...
/// }
/// ```
pub trait Cursor {
    /// Position at the first key-value pair.
    fn seek_first(&mut self) -> CursorResult;

    /// Advance to the next key-value pair, or `None` at the end.
    fn next(&mut self) -> CursorResult;
}

/// Shared engines are engines too.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_write()
    }
}
