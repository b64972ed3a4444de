//! Redb transactions and cursors.
//!
//! Cursors stream a logical table in batches, re-opening the scan after the
//! last key seen whenever a batch runs out.

use std::collections::VecDeque;

use redb::{ReadTransaction, ReadableTable, WriteTransaction};

use crate::engine::{Cursor, CursorResult, KeyValue, StorageError, Transaction};

use super::tables::{decode_key, encode_key, table_end_key, table_start_key, DATA_TABLE};

/// Entries fetched per cursor batch.
const DEFAULT_BATCH_SIZE: usize = 1000;

/// A read-only or read-write Redb transaction.
#[allow(clippy::large_enum_variant)]
pub enum RedbTransaction {
    /// A read-only transaction.
    Read(ReadTransaction),
    /// A read-write transaction.
    Write(WriteTransaction),
}

impl RedbTransaction {
    /// Wrap a read-only transaction.
    pub const fn new_read(tx: ReadTransaction) -> Self {
        Self::Read(tx)
    }

    /// Wrap a read-write transaction.
    pub const fn new_write(tx: WriteTransaction) -> Self {
        Self::Write(tx)
    }

    /// Up to `limit` pairs of `table` with keys strictly after `after`, or
    /// from the start of the table for `None`.
    fn fetch_batch(
        &self,
        table: &str,
        after: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<KeyValue>, StorageError> {
        let start = after.map_or_else(|| table_start_key(table), |k| successor(encode_key(table, k)));
        let end = table_end_key(table);

        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => scan(&t, &start, &end, limit),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(|e| StorageError::Internal(e.to_string()))?;
                scan(&t, &start, &end, limit)
            }
        }
    }
}

/// The smallest byte string strictly greater than `key`.
fn successor(mut key: Vec<u8>) -> Vec<u8> {
    key.push(0x00);
    key
}

fn lookup<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let value = table.get(key).map_err(|e| StorageError::Internal(e.to_string()))?;
    Ok(value.map(|v| v.value().to_vec()))
}

fn scan<T>(table: &T, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<KeyValue>, StorageError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let range = table.range(start..end).map_err(|e| StorageError::Internal(e.to_string()))?;

    let mut entries = Vec::with_capacity(limit.min(1024));
    for item in range {
        let (k, v) = item.map_err(|e| StorageError::Internal(e.to_string()))?;
        if let Some((_, key)) = decode_key(k.value()) {
            entries.push((key.to_vec(), v.value().to_vec()));
        }
        if entries.len() >= limit {
            break;
        }
    }
    Ok(entries)
}

impl Transaction for RedbTransaction {
    type Cursor<'a>
        = RedbCursor<'a>
    where
        Self: 'a;

    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let encoded_key = encode_key(table, key);
        match self {
            Self::Read(tx) => match tx.open_table(DATA_TABLE) {
                Ok(t) => lookup(&t, &encoded_key),
                Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
                Err(e) => Err(StorageError::Internal(e.to_string())),
            },
            Self::Write(tx) => {
                let t = tx.open_table(DATA_TABLE).map_err(|e| StorageError::Internal(e.to_string()))?;
                lookup(&t, &encoded_key)
            }
        }
    }

    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t =
                    tx.open_table(DATA_TABLE).map_err(|e| StorageError::Internal(e.to_string()))?;
                t.insert(encoded_key.as_slice(), value)
                    .map_err(|e| StorageError::Internal(e.to_string()))?;
                Ok(())
            }
        }
    }

    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError> {
        match self {
            Self::Read(_) => Err(StorageError::ReadOnly),
            Self::Write(tx) => {
                let encoded_key = encode_key(table, key);
                let mut t =
                    tx.open_table(DATA_TABLE).map_err(|e| StorageError::Internal(e.to_string()))?;
                let removed = t
                    .remove(encoded_key.as_slice())
                    .map_err(|e| StorageError::Internal(e.to_string()))?;
                Ok(removed.is_some())
            }
        }
    }

    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError> {
        Ok(RedbCursor::new(self, table, DEFAULT_BATCH_SIZE))
    }

    fn commit(self) -> Result<(), StorageError> {
        match self {
            Self::Read(_) => Ok(()),
            Self::Write(tx) => tx.commit().map_err(|e| StorageError::Transaction(e.to_string())),
        }
    }
}

/// A batched forward cursor over one logical table.
pub struct RedbCursor<'a> {
    tx: &'a RedbTransaction,
    table: String,
    buffer: VecDeque<KeyValue>,
    current: Option<KeyValue>,
    positioned: bool,
    exhausted: bool,
    batch_size: usize,
}

impl<'a> RedbCursor<'a> {
    fn new(tx: &'a RedbTransaction, table: &str, batch_size: usize) -> Self {
        Self {
            tx,
            table: table.to_string(),
            buffer: VecDeque::new(),
            current: None,
            positioned: false,
            exhausted: false,
            batch_size: batch_size.max(1),
        }
    }

    fn load_after(&mut self, after: Option<&[u8]>) -> Result<(), StorageError> {
        let batch = self.tx.fetch_batch(&self.table, after, self.batch_size)?;
        self.exhausted = batch.len() < self.batch_size;
        self.buffer = batch.into();
        Ok(())
    }

    fn advance(&mut self) -> CursorResult {
        if self.buffer.is_empty() && !self.exhausted {
            match self.current.take() {
                Some((key, value)) => {
                    self.load_after(Some(key.as_slice()))?;
                    self.current = Some((key, value));
                }
                None => self.exhausted = true,
            }
        }
        self.current = self.buffer.pop_front();
        Ok(self.current.clone())
    }
}

impl Cursor for RedbCursor<'_> {
    fn seek_first(&mut self) -> CursorResult {
        self.positioned = true;
        self.current = None;
        self.load_after(None)?;
        self.advance()
    }

    fn next(&mut self) -> CursorResult {
        if !self.positioned {
            return self.seek_first();
        }
        self.advance()
    }
}
