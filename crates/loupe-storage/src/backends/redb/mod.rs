//! Redb storage backend.
//!
//! Redb requires statically named tables, so every logical table lives in a
//! single physical table with the table name prefixed to each key (see
//! [`tables`]).
//!
//! ```ignore
//! use loupe_storage::backends::redb::{RedbConfig, RedbEngine};
//!
//! let engine = RedbEngine::open_with_config(
//!     "catalog.redb",
//!     RedbConfig::new().cache_size(64 * 1024 * 1024),
//! )?;
//! ```

mod engine;
pub mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbCursor, RedbTransaction};
