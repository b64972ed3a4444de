//! Metrics for a catalog.
//!
//! Counters are plain atomics so recording never blocks. Every recording is
//! also forwarded to the [`metrics`] crate facade; install a recorder (for
//! example a Prometheus exporter) to export them.
//!
//! # Example
//!
//! ```ignore
//! let catalog = Catalog::in_memory(CatalogConfig::new(4, DistanceMetric::Cosine))?;
//! catalog.ingest("a", vec![1.0, 0.0, 0.0, 0.0])?;
//!
//! let snapshot = catalog.metrics();
//! println!("ingested: {}", snapshot.ingest.accepted);
//! println!("mean query latency: {:?}", snapshot.queries.avg_duration);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// All metrics of one catalog.
#[derive(Debug, Default)]
pub struct CatalogMetrics {
    /// Ingest outcomes.
    pub ingest: IngestMetrics,
    /// Query latency.
    pub queries: QueryMetrics,
    /// Removals and rebuilds.
    pub maintenance: MaintenanceMetrics,
}

impl CatalogMetrics {
    /// Create a zeroed metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingest. `duplicate` is set when the entry joined a group of
    /// two or more.
    pub fn record_ingest(&self, accepted: bool, duplicate: bool) {
        if accepted {
            self.ingest.accepted.fetch_add(1, Ordering::Relaxed);
            ::metrics::counter!("loupe_ingests_total").increment(1);
        } else {
            self.ingest.unchanged.fetch_add(1, Ordering::Relaxed);
            ::metrics::counter!("loupe_ingests_unchanged_total").increment(1);
        }
        if duplicate {
            self.ingest.duplicates.fetch_add(1, Ordering::Relaxed);
            ::metrics::counter!("loupe_duplicates_detected_total").increment(1);
        }
    }

    /// Record a rejected ingest.
    pub fn record_rejected(&self) {
        self.ingest.rejected.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("loupe_ingests_rejected_total").increment(1);
    }

    /// Record a query with its duration.
    pub fn record_query(&self, duration: Duration) {
        self.queries.record(duration);
        ::metrics::counter!("loupe_queries_total").increment(1);
        ::metrics::histogram!("loupe_query_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a removal.
    pub fn record_removal(&self) {
        self.maintenance.removals.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("loupe_removals_total").increment(1);
    }

    /// Record a completed rebuild.
    pub fn record_rebuild(&self, duration: Duration, purged: usize) {
        self.maintenance.rebuilds.fetch_add(1, Ordering::Relaxed);
        self.maintenance
            .last_rebuild_ns
            .store(saturating_nanos(duration), Ordering::Relaxed);
        ::metrics::counter!("loupe_rebuilds_total").increment(1);
        ::metrics::histogram!("loupe_rebuild_duration_seconds").record(duration.as_secs_f64());
        ::metrics::counter!("loupe_entries_purged_total").increment(purged as u64);
    }

    /// Record a failed rebuild.
    pub fn record_rebuild_failure(&self) {
        self.maintenance.rebuild_failures.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!("loupe_rebuild_failures_total").increment(1);
    }

    /// Publish the current store shape as gauges.
    #[allow(clippy::cast_precision_loss, clippy::unused_self)]
    pub fn update_store(&self, active: usize, deleted: usize, fragmentation: f64) {
        ::metrics::gauge!("loupe_active_entries").set(active as f64);
        ::metrics::gauge!("loupe_deleted_entries").set(deleted as f64);
        ::metrics::gauge!("loupe_fragmentation_ratio").set(fragmentation);
    }

    /// A point-in-time copy of every counter.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ingest: IngestSnapshot {
                accepted: self.ingest.accepted.load(Ordering::Relaxed),
                unchanged: self.ingest.unchanged.load(Ordering::Relaxed),
                rejected: self.ingest.rejected.load(Ordering::Relaxed),
                duplicates: self.ingest.duplicates.load(Ordering::Relaxed),
            },
            queries: self.queries.snapshot(),
            maintenance: MaintenanceSnapshot {
                removals: self.maintenance.removals.load(Ordering::Relaxed),
                rebuilds: self.maintenance.rebuilds.load(Ordering::Relaxed),
                rebuild_failures: self.maintenance.rebuild_failures.load(Ordering::Relaxed),
                last_rebuild: match self.maintenance.last_rebuild_ns.load(Ordering::Relaxed) {
                    0 => None,
                    ns => Some(Duration::from_nanos(ns)),
                },
            },
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.ingest.accepted,
            &self.ingest.unchanged,
            &self.ingest.rejected,
            &self.ingest.duplicates,
            &self.maintenance.removals,
            &self.maintenance.rebuilds,
            &self.maintenance.rebuild_failures,
            &self.maintenance.last_rebuild_ns,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.queries.reset();
    }
}

/// Ingest counters.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    accepted: AtomicU64,
    unchanged: AtomicU64,
    rejected: AtomicU64,
    duplicates: AtomicU64,
}

/// Query counters.
#[derive(Debug)]
pub struct QueryMetrics {
    total: AtomicU64,
    total_duration_ns: AtomicU64,
    max_duration_ns: AtomicU64,
}

impl QueryMetrics {
    fn record(&self, duration: Duration) {
        let ns = saturating_nanos(duration);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.total_duration_ns.fetch_add(ns, Ordering::Relaxed);
        self.max_duration_ns.fetch_max(ns, Ordering::Relaxed);
    }

    fn snapshot(&self) -> QuerySnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let total_ns = self.total_duration_ns.load(Ordering::Relaxed);
        QuerySnapshot {
            total,
            avg_duration: if total > 0 {
                Duration::from_nanos(total_ns / total)
            } else {
                Duration::ZERO
            },
            max_duration: if total > 0 {
                Some(Duration::from_nanos(self.max_duration_ns.load(Ordering::Relaxed)))
            } else {
                None
            },
        }
    }

    fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.total_duration_ns.store(0, Ordering::Relaxed);
        self.max_duration_ns.store(0, Ordering::Relaxed);
    }
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self {
            total: AtomicU64::new(0),
            total_duration_ns: AtomicU64::new(0),
            max_duration_ns: AtomicU64::new(0),
        }
    }
}

/// Removal and rebuild counters.
#[derive(Debug, Default)]
pub struct MaintenanceMetrics {
    removals: AtomicU64,
    rebuilds: AtomicU64,
    rebuild_failures: AtomicU64,
    last_rebuild_ns: AtomicU64,
}

/// Point-in-time copy of [`CatalogMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Ingest counters.
    pub ingest: IngestSnapshot,
    /// Query counters.
    pub queries: QuerySnapshot,
    /// Removal and rebuild counters.
    pub maintenance: MaintenanceSnapshot,
}

/// Ingest counters at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSnapshot {
    /// New or changed entries written.
    pub accepted: u64,
    /// Re-ingests of an identical active entry.
    pub unchanged: u64,
    /// Ingests refused for invalid input.
    pub rejected: u64,
    /// Ingests that ended in a group of two or more.
    pub duplicates: u64,
}

/// Query counters at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuerySnapshot {
    /// Queries answered.
    pub total: u64,
    /// Mean latency.
    pub avg_duration: Duration,
    /// Worst latency, if any query ran.
    pub max_duration: Option<Duration>,
}

/// Maintenance counters at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceSnapshot {
    /// Entries soft-deleted.
    pub removals: u64,
    /// Rebuilds completed.
    pub rebuilds: u64,
    /// Rebuilds that failed.
    pub rebuild_failures: u64,
    /// Duration of the latest completed rebuild.
    pub last_rebuild: Option<Duration>,
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_counters() {
        let metrics = CatalogMetrics::new();
        metrics.record_ingest(true, false);
        metrics.record_ingest(true, true);
        metrics.record_ingest(false, false);
        metrics.record_rejected();

        let snapshot = metrics.snapshot().ingest;
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(snapshot.duplicates, 1);
        assert_eq!(snapshot.unchanged, 1);
        assert_eq!(snapshot.rejected, 1);
    }

    #[test]
    fn test_query_latency() {
        let metrics = CatalogMetrics::new();
        assert_eq!(metrics.snapshot().queries.max_duration, None);

        metrics.record_query(Duration::from_micros(100));
        metrics.record_query(Duration::from_micros(300));
        let snapshot = metrics.snapshot().queries;
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.avg_duration, Duration::from_micros(200));
        assert_eq!(snapshot.max_duration, Some(Duration::from_micros(300)));
    }

    #[test]
    fn test_rebuild_counters_and_reset() {
        let metrics = CatalogMetrics::new();
        metrics.record_removal();
        metrics.record_rebuild(Duration::from_millis(5), 3);
        metrics.record_rebuild_failure();

        let snapshot = metrics.snapshot().maintenance;
        assert_eq!(snapshot.removals, 1);
        assert_eq!(snapshot.rebuilds, 1);
        assert_eq!(snapshot.rebuild_failures, 1);
        assert_eq!(snapshot.last_rebuild, Some(Duration::from_millis(5)));

        metrics.reset();
        assert_eq!(metrics.snapshot().maintenance.rebuilds, 0);
        assert_eq!(metrics.snapshot().queries.total, 0);
    }
}
