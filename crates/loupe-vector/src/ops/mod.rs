//! Search operators outside the graph.
//!
//! - [`ExactKnn`] - brute-force top-k, the ground truth for recall checks

mod exact_knn;

pub use exact_knn::ExactKnn;
