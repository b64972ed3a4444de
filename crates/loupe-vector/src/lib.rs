//! Loupe Vector
//!
//! Vector storage and approximate nearest-neighbor search for the Loupe
//! catalog.
//!
//! # Overview
//!
//! - **Vector store**: durable mapping from [`CatalogId`] to embedding with
//!   soft delete and an insertion counter ([`store::VectorStore`])
//! - **Similarity index**: layered proximity graph with tombstoning and
//!   deterministic tie-breaking ([`index::SimilarityIndex`])
//! - **Exact baseline**: brute-force top-k used to measure recall
//!   ([`ops::ExactKnn`])
//!
//! The index never owns vectors; it reads them through a
//! [`store::VectorSource`], either a live [`store::StoreView`] or a rebuild
//! [`store::EntrySnapshot`].
//!
//! # Example
//!
//! ```ignore
//! use loupe_storage::backends::RedbEngine;
//! use loupe_vector::index::{HnswConfig, SimilarityIndex};
//! use loupe_vector::store::VectorStore;
//! use loupe_vector::{CatalogId, DistanceMetric, Embedding};
//!
//! let store = VectorStore::open(RedbEngine::in_memory()?, 4, DistanceMetric::Cosine)?;
//! let index = SimilarityIndex::new(4, DistanceMetric::Cosine, HnswConfig::default());
//!
//! let id = CatalogId::new("ring-001")?;
//! store.insert(&id, Embedding::new(vec![1.0, 0.0, 0.0, 0.0])?)?;
//! let entry = store.get(&id)?.expect("just inserted");
//! index.insert(&id, entry.inserted_at, &store.view()?)?;
//!
//! let query = Embedding::new(vec![0.9, 0.1, 0.0, 0.0])?;
//! let hits = index.query(&query, 5, &store.view()?)?;
//! ```

pub mod distance;
pub mod error;
pub mod index;
pub mod ops;
pub mod store;
pub mod types;

pub use distance::DistanceMetric;
pub use error::VectorError;
pub use index::{NeighborResult, SimilarityIndex};
pub use types::{CatalogId, Embedding};
