//! Loupe
//!
//! Similarity search and near-duplicate detection for a growing catalog of
//! product-image embeddings.
//!
//! # Features
//!
//! - **Nearest neighbors**: approximate top-k over a layered proximity graph,
//!   with an exact scan for validation
//! - **Duplicate groups**: entries linked transitively by similarity at or
//!   above a threshold
//! - **Confidence bands**: route weak matches to review and strong ones to
//!   auto-merge
//! - **Maintenance**: soft delete, fragmentation tracking and rebuild with an
//!   atomic swap
//!
//! # Example
//!
//! ```ignore
//! use loupe::{Catalog, CatalogConfig, DistanceMetric};
//!
//! let catalog = Catalog::in_memory(CatalogConfig::new(4, DistanceMetric::Cosine))?;
//!
//! catalog.ingest("A", vec![1.0, 0.0, 0.0, 0.0])?;
//! catalog.ingest("B", vec![0.99, 0.14, 0.0, 0.0])?;
//! catalog.ingest("C", vec![0.0, 1.0, 0.0, 0.0])?;
//!
//! // A and B are near-duplicates, C stands alone.
//! assert_eq!(catalog.group_of("A")?.map(|g| g.len()), Some(2));
//!
//! let hits = catalog.query(&[1.0, 0.0, 0.0, 0.0], 2)?;
//! assert_eq!(hits[0].id.as_str(), "A");
//! ```

pub use loupe_storage::{StorageEngine, StorageError};
pub use loupe_vector::index::{HnswConfig, IndexStats};
pub use loupe_vector::store::CatalogEntry;
pub use loupe_vector::{CatalogId, DistanceMetric, Embedding, NeighborResult, VectorError};

pub mod catalog;
pub mod confidence;
pub mod config;
pub mod dedup;
pub mod error;
pub mod maintainer;
pub mod metrics;

pub use catalog::{
    Catalog, CatalogStats, IngestOutcome, QueryOptions, RebuildOutcome, RemoveOutcome,
};
pub use confidence::{ConfidenceBand, ConfidenceClassifier};
pub use config::{CatalogConfig, ConfidenceConfig, DedupConfig, MaintenanceConfig, StorageConfig};
pub use dedup::{DuplicateClusterer, DuplicateGroup};
pub use error::{Error, Result};
pub use maintainer::IndexMaintainer;
pub use metrics::{CatalogMetrics, MetricsSnapshot};
