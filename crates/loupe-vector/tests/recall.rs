//! Recall of the approximate index against the exact baseline.

use std::collections::HashSet;

use loupe_storage::backends::RedbEngine;
use loupe_vector::index::{HnswConfig, SimilarityIndex};
use loupe_vector::ops::ExactKnn;
use loupe_vector::store::{EntrySnapshot, VectorStore};
use loupe_vector::{CatalogId, DistanceMetric, Embedding};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DIMENSION: usize = 16;

fn random_embedding(rng: &mut StdRng) -> Embedding {
    Embedding::new((0..DIMENSION).map(|_| rng.gen_range(-1.0f32..1.0)).collect()).unwrap()
}

fn populated(metric: DistanceMetric, n: usize) -> (VectorStore<RedbEngine>, SimilarityIndex) {
    let mut rng = StdRng::seed_from_u64(42);
    let store = VectorStore::open(RedbEngine::in_memory().unwrap(), DIMENSION, metric).unwrap();
    let index = SimilarityIndex::new(DIMENSION, metric, HnswConfig::default());

    for i in 0..n {
        let id = CatalogId::new(format!("img-{i:05}")).unwrap();
        store.insert(&id, random_embedding(&mut rng)).unwrap();
        let inserted_at = store.get(&id).unwrap().unwrap().inserted_at;
        index.insert(&id, inserted_at, &store.view().unwrap()).unwrap();
    }
    (store, index)
}

fn recall(store: &VectorStore<RedbEngine>, index: &SimilarityIndex, metric: DistanceMetric) -> f64 {
    let mut rng = StdRng::seed_from_u64(7);
    let k = 10;
    let queries = 50;
    let mut hits = 0usize;

    let view = store.view().unwrap();
    for _ in 0..queries {
        let query = random_embedding(&mut rng);
        let approx: HashSet<CatalogId> =
            index.query(&query, k, &view).unwrap().into_iter().map(|r| r.id).collect();
        let exact = ExactKnn::search(&query, k, metric, view.active()).unwrap();
        hits += exact.iter().filter(|r| approx.contains(&r.id)).count();
    }
    hits as f64 / (k * queries) as f64
}

#[test]
fn cosine_recall_at_10() {
    let (store, index) = populated(DistanceMetric::Cosine, 1000);
    let r = recall(&store, &index, DistanceMetric::Cosine);
    assert!(r >= 0.9, "recall {r}");
}

#[test]
fn euclidean_recall_at_10() {
    let (store, index) = populated(DistanceMetric::Euclidean, 1000);
    let r = recall(&store, &index, DistanceMetric::Euclidean);
    assert!(r >= 0.9, "recall {r}");
}

#[test]
fn recall_survives_deletes_and_rebuild() {
    let metric = DistanceMetric::Cosine;
    let (store, index) = populated(metric, 600);

    for i in (0..600).step_by(3) {
        let id = CatalogId::new(format!("img-{i:05}")).unwrap();
        store.soft_delete(&id).unwrap();
        index.remove(&id).unwrap();
    }
    assert_eq!(index.tombstone_count().unwrap(), 200);

    // Deleted entries never surface, even before compaction.
    let view = store.view().unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..20 {
        let hits = index.query(&random_embedding(&mut rng), 20, &view).unwrap();
        assert!(hits.iter().all(|h| store.is_active(&h.id).unwrap()));
    }
    drop(view);

    let snapshot = EntrySnapshot::new(store.active_entries().unwrap()).unwrap();
    let rebuilt = SimilarityIndex::build(
        DIMENSION,
        metric,
        HnswConfig::default(),
        snapshot.entries().iter().map(|e| (&e.id, e.inserted_at)),
        &snapshot,
    )
    .unwrap();
    store.purge_deleted().unwrap();

    assert_eq!(rebuilt.tombstone_count().unwrap(), 0);
    assert_eq!(rebuilt.live_len().unwrap(), 400);
    let r = recall(&store, &rebuilt, metric);
    assert!(r >= 0.9, "recall after rebuild {r}");
}
