//! Loupe Storage
//!
//! This crate provides the durable key-value layer underneath the Loupe
//! catalog. Catalog entries and catalog metadata are written through it; the
//! similarity graph itself is never persisted and is rebuilt from these
//! records on open.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - ACID transaction support with read/write operations
//! - [`Cursor`] - Ordered forward iteration over a logical table
//!
//! # Example
//!
//! ```ignore
//! use loupe_storage::{StorageEngine, Transaction};
//! use loupe_storage::backends::RedbEngine;
//!
//! let engine = RedbEngine::open("catalog.redb")?;
//!
//! let mut tx = engine.begin_write()?;
//! tx.put("catalog_entries", b"ring-001", b"...")?;
//! tx.commit()?;
//!
//! let tx = engine.begin_read()?;
//! let value = tx.get("catalog_entries", b"ring-001")?;
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and abstractions
//! - [`backends`] - Concrete storage backend implementations

pub mod backends;
pub mod engine;

pub use engine::{
    Cursor, CursorResult, KeyValue, StorageEngine, StorageError, StorageResult, Transaction,
};
