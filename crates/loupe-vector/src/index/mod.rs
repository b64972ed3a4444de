//! Approximate nearest-neighbor index.
//!
//! - [`SimilarityIndex`] - layered proximity graph with tombstone deletion
//! - [`HnswConfig`] - graph parameters
//! - [`NeighborResult`] - ranked query result

mod config;
pub mod graph;
mod hnsw;
mod traits;

pub use config::HnswConfig;
pub use hnsw::{IndexStats, SimilarityIndex};
pub use traits::NeighborResult;
pub(crate) use traits::ranked;
