//! Query results.

use serde::{Deserialize, Serialize};

use crate::types::CatalogId;

/// One ranked neighbor of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    /// The matching catalog entry.
    pub id: CatalogId,
    /// Similarity to the query; higher is closer.
    pub score: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}

impl NeighborResult {
    /// Create a result.
    #[must_use]
    pub const fn new(id: CatalogId, score: f32, rank: usize) -> Self {
        Self { id, score, rank }
    }
}

/// Number scored results `1..=n` in order.
pub(crate) fn ranked(scored: impl IntoIterator<Item = (CatalogId, f32)>) -> Vec<NeighborResult> {
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (id, score))| NeighborResult::new(id, score, i + 1))
        .collect()
}
