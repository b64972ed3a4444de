//! Index maintenance bookkeeping.
//!
//! [`IndexMaintainer`] decides when the graph is fragmented enough to
//! rebuild, makes sure only one rebuild runs at a time, and remembers failed
//! rebuilds so the next maintenance pass retries them. It also owns the
//! backoff policy for writers that collide with a rebuild.
//!
//! The maintainer does not touch the index itself; the catalog hands it the
//! rebuild as a closure.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::MaintenanceConfig;
use crate::error::{Error, Result};

/// Share of store entries that are soft-deleted: `deleted / (active + deleted)`,
/// or 0 for an empty store.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fragmentation_ratio(active: usize, deleted: usize) -> f64 {
    let total = active + deleted;
    if total == 0 {
        0.0
    } else {
        deleted as f64 / total as f64
    }
}

/// Rebuild scheduling state shared by every handle of a catalog.
#[derive(Debug)]
pub struct IndexMaintainer {
    config: MaintenanceConfig,
    rebuilding: AtomicBool,
    pending: AtomicBool,
    completed: AtomicU64,
    failures: AtomicU64,
}

/// Held while a rebuild runs; clears the flag on drop, including on unwind.
#[derive(Debug)]
pub struct RebuildGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl IndexMaintainer {
    /// Create a maintainer with the given policy.
    #[must_use]
    pub const fn new(config: MaintenanceConfig) -> Self {
        Self {
            config,
            rebuilding: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// The maintenance policy.
    #[must_use]
    pub const fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Whether fragmentation strictly exceeds the threshold.
    #[must_use]
    pub fn is_fragmented(&self, active: usize, deleted: usize) -> bool {
        fragmentation_ratio(active, deleted) > self.config.fragmentation_threshold
    }

    /// Whether a maintenance pass should rebuild: the store is fragmented or
    /// an earlier rebuild failed.
    #[must_use]
    pub fn rebuild_due(&self, active: usize, deleted: usize) -> bool {
        self.is_pending() || self.is_fragmented(active, deleted)
    }

    /// Whether a rebuild is running.
    #[must_use]
    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::Acquire)
    }

    /// Whether a failed rebuild is waiting to be retried.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Rebuilds that completed.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Rebuilds that failed.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Schedule a rebuild for the next maintenance pass.
    pub fn mark_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Claim the rebuild slot, or `None` if a rebuild already holds it.
    #[must_use]
    pub fn try_begin(&self) -> Option<RebuildGuard<'_>> {
        self.rebuilding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RebuildGuard { flag: &self.rebuilding })
    }

    /// Run `rebuild` unless another rebuild is in progress.
    ///
    /// Returns `Ok(None)` when the slot was taken. A failure is counted,
    /// marks a rebuild as pending and comes back as
    /// [`Error::RebuildFailed`].
    pub fn run<T>(&self, rebuild: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        let Some(_guard) = self.try_begin() else {
            return Ok(None);
        };
        match rebuild() {
            Ok(value) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                self.pending.store(false, Ordering::Release);
                Ok(Some(value))
            }
            Err(err) => {
                let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                self.pending.store(true, Ordering::Release);
                warn!(error = %err, failures, "index rebuild failed; previous index kept live");
                Err(match err {
                    Error::RebuildFailed(_) => err,
                    other => Error::RebuildFailed(other.to_string()),
                })
            }
        }
    }

    /// Delay before retry number `attempt` (0-based): the base delay doubled
    /// per attempt.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(16)).unwrap_or(u64::MAX);
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor))
    }

    /// Run `op`, retrying with exponential backoff while it reports
    /// [`Error::IndexUnavailable`].
    ///
    /// Other errors return immediately. Once the attempts are used up the
    /// last `IndexUnavailable` is returned.
    pub fn retry<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            match op() {
                Err(Error::IndexUnavailable(reason)) if attempt < self.config.retry_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        %reason,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        "write collided with rebuild; backing off"
                    );
                    ::metrics::counter!("loupe_write_retries_total").increment(1);
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
