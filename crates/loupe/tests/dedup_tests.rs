//! Integration tests for duplicate grouping and queries.
//!
//! These tests verify that:
//! - Entries above the threshold share a group, transitively
//! - Removed entries leave queries and groups
//! - Confidence bands follow the best neighbor

use loupe::{Catalog, CatalogConfig, ConfidenceBand, DistanceMetric, Error};

fn catalog(threshold: f32) -> Catalog {
    let config = CatalogConfig::new(4, DistanceMetric::Cosine)
        .with_dedup_threshold(threshold)
        .with_confidence_cuts(0.95, 0.5);
    Catalog::in_memory(config).expect("failed to create catalog")
}

/// Unit vector at `degrees` in the first two dimensions.
fn angle(degrees: f32) -> Vec<f32> {
    let r = degrees.to_radians();
    vec![r.cos(), r.sin(), 0.0, 0.0]
}

#[test]
fn test_three_entry_scenario() {
    let c = catalog(0.95);
    let a = c.ingest("A", vec![1.0, 0.0, 0.0, 0.0]).unwrap();
    let b = c.ingest("B", vec![0.99, 0.14, 0.0, 0.0]).unwrap();
    let third = c.ingest("C", vec![0.0, 1.0, 0.0, 0.0]).unwrap();

    assert!(a.accepted && b.accepted && third.accepted);
    assert!(a.duplicate_of.is_none());

    let group = b.duplicate_of.expect("B should join A");
    assert_eq!(group.len(), 2);
    assert_eq!(c.group_of("A").unwrap(), c.group_of("B").unwrap());
    assert_eq!(c.group_of("C").unwrap().unwrap().len(), 1);
    assert!(third.duplicate_of.is_none());

    let hits = c.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id.as_str(), "A");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert_eq!(hits[0].rank, 1);
    assert_eq!(hits[1].id.as_str(), "B");
    assert!((hits[1].score - 0.99).abs() < 0.01);
    assert_eq!(hits[1].rank, 2);

    let dupes = c.duplicate_groups().unwrap();
    assert_eq!(dupes.len(), 1);
    assert_eq!(c.all_groups().unwrap().len(), 2);
    c.check_invariants().unwrap();
}

#[test]
fn test_grouping_is_transitive() {
    let c = catalog(0.95);
    // 15 degrees apart clears 0.95 (cos 15 = 0.966); 30 does not (0.866).
    c.ingest("a", angle(0.0)).unwrap();
    c.ingest("c", angle(30.0)).unwrap();
    assert!(c.group_of("a").unwrap().unwrap().len() == 1);

    let bridge = c.ingest("b", angle(15.0)).unwrap();
    let group = bridge.duplicate_of.expect("b bridges a and c");
    assert_eq!(group.len(), 3);
    assert_eq!(c.group_of("a").unwrap(), c.group_of("c").unwrap());
}

#[test]
fn test_removed_entries_disappear() {
    let c = catalog(0.95);
    c.ingest("A", vec![1.0, 0.0, 0.0, 0.0]).unwrap();
    c.ingest("B", vec![0.99, 0.14, 0.0, 0.0]).unwrap();
    c.ingest("C", vec![0.0, 1.0, 0.0, 0.0]).unwrap();
    c.ingest("D", vec![0.0, 0.0, 1.0, 0.0]).unwrap();

    assert!(c.remove("A").unwrap().removed);

    let hits = c.query(&[1.0, 0.0, 0.0, 0.0], 4).unwrap();
    assert!(hits.iter().all(|h| h.id.as_str() != "A"));
    assert_eq!(hits[0].id.as_str(), "B");
    let exact = c.query_exact(&[1.0, 0.0, 0.0, 0.0], 4).unwrap();
    assert!(exact.iter().all(|h| h.id.as_str() != "A"));

    assert!(c.group_of("A").unwrap().is_none());
    assert_eq!(c.group_of("B").unwrap().unwrap().len(), 1);
    c.check_invariants().unwrap();
}

#[test]
fn test_removal_keeps_rest_of_group_together() {
    let c = catalog(0.95);
    c.ingest("a", angle(0.0)).unwrap();
    c.ingest("c", angle(30.0)).unwrap();
    c.ingest("b", angle(15.0)).unwrap();
    c.ingest("z", vec![0.0, 0.0, 0.0, 1.0]).unwrap();

    // Fragmentation 1/4 stays under the rebuild threshold.
    c.remove("b").unwrap();
    assert_eq!(c.group_of("a").unwrap(), c.group_of("c").unwrap());
    assert_eq!(c.group_of("a").unwrap().unwrap().len(), 2);

    // An explicit regroup re-evaluates: without the bridge a and c split.
    assert_eq!(c.regroup().unwrap(), 0);
    assert_eq!(c.group_of("a").unwrap().unwrap().len(), 1);
    c.check_invariants().unwrap();
}

#[test]
fn test_reingest_after_remove() {
    let c = catalog(0.95);
    c.ingest("a", angle(0.0)).unwrap();
    c.ingest("b", angle(5.0)).unwrap();
    c.ingest("x", vec![0.0, 0.0, 1.0, 0.0]).unwrap();
    c.ingest("y", vec![0.0, 0.0, 0.0, 1.0]).unwrap();
    c.remove("b").unwrap();

    let back = c.ingest("b", angle(5.0)).unwrap();
    assert!(back.accepted);
    assert_eq!(back.duplicate_of.unwrap().len(), 2);
    assert!(c.get("b").unwrap().unwrap().active);
    assert_eq!(c.query(&angle(5.0), 1).unwrap()[0].id.as_str(), "b");
    c.check_invariants().unwrap();
}

#[test]
fn test_confidence_follows_best_neighbor() {
    let c = catalog(0.95);
    assert_eq!(c.ingest("a", angle(0.0)).unwrap().confidence, None);
    assert_eq!(c.ingest("b", angle(10.0)).unwrap().confidence, Some(ConfidenceBand::High));
    assert_eq!(c.ingest("m", angle(50.0)).unwrap().confidence, Some(ConfidenceBand::Medium));
    assert_eq!(
        c.ingest("l", vec![0.0, 0.0, 1.0, 0.0]).unwrap().confidence,
        Some(ConfidenceBand::Low)
    );

    assert_eq!(c.classify(0.97), ConfidenceBand::High);
    assert_eq!(c.classify(0.2), ConfidenceBand::Low);
}

#[test]
fn test_ties_go_to_earlier_insert() {
    let c = catalog(0.95);
    // Same direction, so both score exactly 1 under cosine.
    c.ingest("older", vec![0.0, 2.0, 0.0, 0.0]).unwrap();
    c.ingest("newer", vec![0.0, 1.0, 0.0, 0.0]).unwrap();

    let hits = c.query(&[0.0, 1.0, 0.0, 0.0], 2).unwrap();
    assert_eq!(hits[0].score, hits[1].score);
    assert_eq!(hits[0].id.as_str(), "older");
    assert_eq!(hits[1].id.as_str(), "newer");
}

#[test]
fn test_query_errors() {
    let c = catalog(0.95);
    assert!(c.query(&[1.0, 0.0, 0.0, 0.0], 3).unwrap().is_empty());
    c.ingest("a", angle(0.0)).unwrap();

    let err = c.query(&[1.0, 0.0], 3).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 4, actual: 2 }));
    assert!(err.is_recoverable());
    assert!(matches!(c.query(&[1.0, 0.0, 0.0, 0.0], 0), Err(Error::InvalidInput(_))));
    assert!(matches!(c.query(&[0.0; 4], 1), Err(Error::InvalidInput(_))));
    assert!(matches!(c.remove("nobody"), Err(Error::NotFound(_))));
}

#[test]
fn test_euclidean_catalog() {
    let config = CatalogConfig::new(2, DistanceMetric::Euclidean).with_dedup_threshold(0.9);
    let c = Catalog::in_memory(config).unwrap();
    c.ingest("origin", vec![0.0, 0.0]).unwrap();
    let near = c.ingest("near", vec![0.05, 0.0]).unwrap();
    c.ingest("far", vec![3.0, 4.0]).unwrap();

    assert_eq!(near.duplicate_of.unwrap().len(), 2);
    let hits = c.query(&[0.0, 0.0], 3).unwrap();
    assert_eq!(hits[0].id.as_str(), "origin");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[2].score - 1.0 / 6.0).abs() < 1e-6);
}

#[test]
fn test_ingest_many_reports_each_item() {
    let c = catalog(0.95);
    let results = c.ingest_many(vec![
        ("a", angle(0.0)),
        ("bad", vec![1.0, 0.0]),
        ("b", angle(3.0)),
    ]);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::DimensionMismatch { .. })));
    assert_eq!(results[2].as_ref().unwrap().duplicate_of.as_ref().unwrap().len(), 2);
    assert_eq!(c.stats().unwrap().active, 2);
}

#[test]
fn test_extreme_magnitudes_group_and_query() {
    let c = catalog(0.95);
    let tiny = vec![1e-25, 0.0, 0.0, 0.0];
    let huge = vec![0.0, 1e20, 0.0, 0.0];
    c.ingest("tiny-1", tiny.clone()).unwrap();
    let second_tiny = c.ingest("tiny-2", tiny.clone()).unwrap();
    c.ingest("huge-1", huge.clone()).unwrap();
    let second_huge = c.ingest("huge-2", huge.clone()).unwrap();

    assert_eq!(second_tiny.duplicate_of.expect("tiny copies should group").len(), 2);
    assert_eq!(second_huge.duplicate_of.expect("huge copies should group").len(), 2);

    let hits = c.query(&huge, 2).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, ["huge-1", "huge-2"]);
    assert!(hits.iter().all(|h| (h.score - 1.0).abs() < 1e-6));

    let hits = c.query(&tiny, 1).unwrap();
    assert_eq!(hits[0].id.as_str(), "tiny-1");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    c.check_invariants().unwrap();
}

#[test]
fn test_norm_overflow_is_rejected() {
    let c = catalog(0.95);
    let overflow = vec![f32::MAX, f32::MAX / 2.0, 0.0, 0.0];

    assert!(matches!(c.ingest("overflow", overflow.clone()), Err(Error::InvalidInput(_))));
    assert!(matches!(c.query(&overflow, 1), Err(Error::InvalidInput(_))));
    assert!(matches!(c.query_exact(&overflow, 1), Err(Error::InvalidInput(_))));
    assert_eq!(c.stats().unwrap().active, 0);
    assert_eq!(c.metrics().ingest.rejected, 1);
}
