//! Durable catalog entry storage.
//!
//! [`VectorStore`] owns every [`CatalogEntry`]. The similarity index reads
//! vectors through [`VectorSource`], which only ever exposes *active* entries;
//! a soft-deleted entry is invisible to scoring even while its graph node
//! still exists.

mod entry;
mod source;
mod vector_store;

pub use entry::CatalogEntry;
pub use source::{EntrySnapshot, StoreView, VectorSource};
pub use vector_store::VectorStore;
