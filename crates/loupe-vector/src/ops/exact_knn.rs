//! Exact k-nearest neighbors by brute force.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::distance::DistanceMetric;
use crate::error::VectorError;
use crate::index::{ranked, NeighborResult};
use crate::store::CatalogEntry;
use crate::types::{CatalogId, Embedding};

/// Brute-force top-k over catalog entries.
///
/// Scores every active entry, so it costs O(n * d). Ranking follows the
/// index: descending score, ties to the earlier insertion. Useful for small
/// catalogs and for measuring the recall of
/// [`SimilarityIndex`](crate::index::SimilarityIndex).
///
/// # Example
///
/// ```ignore
/// let view = store.view()?;
/// let truth = ExactKnn::search(&query, 10, DistanceMetric::Cosine, view.active())?;
/// ```
pub struct ExactKnn;

#[derive(Debug)]
struct Scored<'a> {
    id: &'a CatalogId,
    score: f32,
    inserted_at: u64,
}

impl PartialEq for Scored<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored<'_> {}

impl PartialOrd for Scored<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.inserted_at.cmp(&self.inserted_at))
    }
}

impl ExactKnn {
    /// The `k` best active entries for `query`.
    ///
    /// # Errors
    ///
    /// - [`VectorError::InvalidK`] if `k == 0`
    /// - [`VectorError::DimensionMismatch`] if an entry's dimension differs
    ///   from the query's
    pub fn search<'a, I>(
        query: &Embedding,
        k: usize,
        metric: DistanceMetric,
        entries: I,
    ) -> Result<Vec<NeighborResult>, VectorError>
    where
        I: IntoIterator<Item = &'a CatalogEntry>,
    {
        if k == 0 {
            return Err(VectorError::InvalidK(k));
        }

        // Min-heap of the best k seen so far; the top is the weakest.
        let mut heap: BinaryHeap<Reverse<Scored<'a>>> =
            BinaryHeap::with_capacity(k.saturating_add(1).min(1024));

        for entry in entries.into_iter().filter(|e| e.active) {
            if entry.vector.dimension() != query.dimension() {
                return Err(VectorError::DimensionMismatch {
                    expected: query.dimension(),
                    actual: entry.vector.dimension(),
                });
            }
            let scored = Scored {
                id: &entry.id,
                score: metric.score(query, &entry.vector),
                inserted_at: entry.inserted_at,
            };

            if heap.len() < k {
                heap.push(Reverse(scored));
            } else if heap.peek().is_some_and(|Reverse(weakest)| scored > *weakest) {
                heap.pop();
                heap.push(Reverse(scored));
            }
        }

        let mut best: Vec<Scored<'a>> = heap.into_iter().map(|Reverse(s)| s).collect();
        best.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ranked(best.into_iter().map(|s| (s.id.clone(), s.score))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, inserted_at: u64, values: &[f32], active: bool) -> CatalogEntry {
        CatalogEntry {
            id: CatalogId::new(id).unwrap(),
            vector: Embedding::new(values.to_vec()).unwrap(),
            active,
            inserted_at,
        }
    }

    #[test]
    fn ranks_by_score_then_insertion() {
        let entries = vec![
            entry("far", 0, &[0.0, 1.0], true),
            entry("twin-b", 2, &[1.0, 0.0], true),
            entry("twin-a", 1, &[2.0, 0.0], true),
            entry("gone", 3, &[1.0, 0.0], false),
        ];
        let query = Embedding::new(vec![1.0, 0.0]).unwrap();
        let hits = ExactKnn::search(&query, 3, DistanceMetric::Cosine, &entries).unwrap();

        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["twin-a", "twin-b", "far"]);
        assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn k_larger_than_catalog() {
        let entries = vec![entry("a", 0, &[0.0, 0.0], true)];
        let query = Embedding::new(vec![3.0, 4.0]).unwrap();
        let hits = ExactKnn::search(&query, 10, DistanceMetric::Euclidean, &entries).unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_k_and_mismatched_entries() {
        let entries = vec![entry("a", 0, &[1.0, 0.0, 0.0], true)];
        let query = Embedding::new(vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            ExactKnn::search(&query, 0, DistanceMetric::Cosine, &entries),
            Err(VectorError::InvalidK(0))
        ));
        assert!(matches!(
            ExactKnn::search(&query, 1, DistanceMetric::Cosine, &entries),
            Err(VectorError::DimensionMismatch { .. })
        ));
    }
}
