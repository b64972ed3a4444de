//! Property-based tests for grouping and queries.

use std::collections::BTreeSet;

use loupe::{Catalog, CatalogConfig, DistanceMetric};
use proptest::prelude::*;

const DIM: usize = 3;

fn component() -> impl Strategy<Value = f32> {
    (-10i8..=10i8).prop_map(|x| f32::from(x) / 10.0)
}

/// Vectors kept away from the origin so cosine is well defined.
fn vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(component(), DIM)
        .prop_filter("near-zero vector", |v| v.iter().map(|x| x * x).sum::<f32>() > 0.04)
}

#[derive(Debug, Clone)]
enum Op {
    Ingest(u8, Vec<f32>),
    Remove(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..20, vector()).prop_map(|(id, v)| Op::Ingest(id, v)),
        1 => (0u8..20).prop_map(Op::Remove),
    ]
}

fn catalog(threshold: f32) -> Catalog {
    let config = CatalogConfig::new(DIM, DistanceMetric::Cosine).with_dedup_threshold(threshold);
    Catalog::in_memory(config).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn groups_partition_active_entries(ops in prop::collection::vec(op(), 1..60)) {
        let c = catalog(0.9);
        let mut active = BTreeSet::new();
        for op in &ops {
            match op {
                Op::Ingest(id, v) => {
                    let id = format!("e{id}");
                    c.ingest(&id, v.clone()).unwrap();
                    active.insert(id);
                }
                Op::Remove(id) => {
                    let id = format!("e{id}");
                    if c.remove(&id).is_ok() {
                        active.remove(&id);
                    }
                }
            }
        }

        c.check_invariants().unwrap();
        let groups = c.all_groups().unwrap();
        let mut seen = BTreeSet::new();
        for group in &groups {
            for member in group.members() {
                prop_assert!(seen.insert(member.as_str().to_string()), "{member} in two groups");
            }
        }
        prop_assert_eq!(seen, active);
    }

    #[test]
    fn higher_threshold_refines_groups(
        vectors in prop::collection::vec(vector(), 1..30),
        low in 0.5f32..0.9,
        gap in 0.01f32..0.09,
    ) {
        let loose = catalog(low);
        let strict = catalog(low + gap);
        for (i, v) in vectors.iter().enumerate() {
            loose.ingest(&format!("e{i}"), v.clone()).unwrap();
            strict.ingest(&format!("e{i}"), v.clone()).unwrap();
        }

        for i in 0..vectors.len() {
            let id = format!("e{i}");
            let tight = strict.group_of(&id).unwrap().unwrap();
            let wide = loose.group_of(&id).unwrap().unwrap();
            for member in tight.members() {
                prop_assert!(wide.contains(member), "{member} split off under the looser threshold");
            }
        }
    }

    #[test]
    fn entry_finds_itself(vectors in prop::collection::vec(vector(), 1..40)) {
        let c = catalog(0.95);
        for (i, v) in vectors.iter().enumerate() {
            c.ingest(&format!("e{i}"), v.clone()).unwrap();
        }
        for (i, v) in vectors.iter().enumerate() {
            let hits = c.query(v, vectors.len()).unwrap();
            prop_assert!((hits[0].score - 1.0).abs() < 1e-5);
            let id = format!("e{i}");
            prop_assert!(hits.iter().any(|h| h.id.as_str() == id));
        }
    }
}
