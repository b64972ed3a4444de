//! Property tests for the similarity index.

use loupe_vector::index::{HnswConfig, SimilarityIndex};
use loupe_vector::store::{CatalogEntry, EntrySnapshot};
use loupe_vector::{CatalogId, DistanceMetric, Embedding};
use proptest::prelude::*;

fn vectors(dim: usize) -> impl Strategy<Value = Vec<Vec<f32>>> {
    prop::collection::vec(
        prop::collection::vec(-10.0f32..10.0, dim)
            .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3)),
        1..40,
    )
}

fn snapshot(vectors: &[Vec<f32>]) -> EntrySnapshot {
    EntrySnapshot::new(
        vectors
            .iter()
            .enumerate()
            .map(|(i, v)| CatalogEntry {
                id: CatalogId::new(format!("v{i}")).unwrap(),
                vector: Embedding::new(v.clone()).unwrap(),
                active: true,
                inserted_at: i as u64,
            })
            .collect(),
    )
    .unwrap()
}

fn build(snapshot: &EntrySnapshot, dim: usize, metric: DistanceMetric) -> SimilarityIndex {
    SimilarityIndex::build(
        dim,
        metric,
        HnswConfig::new(6),
        snapshot.entries().iter().map(|e| (&e.id, e.inserted_at)),
        snapshot,
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn self_query_scores_maximally(data in vectors(5), metric in prop_oneof![
        Just(DistanceMetric::Cosine),
        Just(DistanceMetric::Euclidean),
    ]) {
        let snapshot = snapshot(&data);
        let index = build(&snapshot, 5, metric);

        for entry in snapshot.entries() {
            let hits = index.query(&entry.vector, 1, &snapshot).unwrap();
            prop_assert_eq!(hits.len(), 1);
            prop_assert!((hits[0].score - metric.max_score()).abs() < 1e-4);
        }
    }

    #[test]
    fn results_are_sorted_ranked_and_bounded(data in vectors(4), k in 1usize..20) {
        let snapshot = snapshot(&data);
        let index = build(&snapshot, 4, DistanceMetric::Cosine);
        let hits = index.query(&snapshot.entries()[0].vector, k, &snapshot).unwrap();

        prop_assert!(hits.len() <= k.min(data.len()));
        for (i, hit) in hits.iter().enumerate() {
            prop_assert_eq!(hit.rank, i + 1);
            prop_assert!((-1.0..=1.0).contains(&hit.score));
        }
        prop_assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn removed_ids_never_returned(data in vectors(3), remove_every in 2usize..5) {
        let snapshot = snapshot(&data);
        let index = build(&snapshot, 3, DistanceMetric::Euclidean);

        let removed: Vec<CatalogId> = snapshot
            .entries()
            .iter()
            .step_by(remove_every)
            .map(|e| e.id.clone())
            .collect();
        for id in &removed {
            prop_assert!(index.remove(id).unwrap());
        }

        for entry in snapshot.entries() {
            let hits = index.query(&entry.vector, data.len(), &snapshot).unwrap();
            prop_assert!(hits.iter().all(|h| !removed.contains(&h.id)));
        }
    }
}
