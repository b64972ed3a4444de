//! Catalog configuration.
//!
//! Settings are fixed when a catalog opens. Dimension and metric are also
//! persisted with the store; the rest can change between runs and takes
//! effect on the graph at the next rebuild.

use std::path::Path;

use loupe_storage::backends::RedbConfig;
use loupe_vector::index::HnswConfig;
use loupe_vector::DistanceMetric;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration options for opening a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Embedding dimension `D`.
    pub dimension: usize,
    /// Similarity metric, fixed for the lifetime of the store.
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Proximity graph parameters.
    #[serde(default)]
    pub index: HnswConfig,
    /// Duplicate grouping.
    #[serde(default)]
    pub dedup: DedupConfig,
    /// Confidence band cut points.
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    /// Fragmentation and rebuild policy.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    /// Storage tuning.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl CatalogConfig {
    /// Create a configuration with defaults for everything but the dimension
    /// and metric.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            dimension,
            metric,
            index: HnswConfig::default(),
            dedup: DedupConfig::default(),
            confidence: ConfidenceConfig::default(),
            maintenance: MaintenanceConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Set the graph parameters.
    #[must_use]
    pub fn with_index(mut self, index: HnswConfig) -> Self {
        self.index = index;
        self
    }

    /// Set the duplicate similarity threshold.
    #[must_use]
    pub const fn with_dedup_threshold(mut self, threshold: f32) -> Self {
        self.dedup.threshold = threshold;
        self
    }

    /// Set how many neighbors an ingest inspects for duplicates.
    #[must_use]
    pub const fn with_dedup_k(mut self, k: usize) -> Self {
        self.dedup.k = k;
        self
    }

    /// Set the confidence cut points.
    #[must_use]
    pub const fn with_confidence_cuts(mut self, high_cut: f32, low_cut: f32) -> Self {
        self.confidence = ConfidenceConfig { high_cut, low_cut };
        self
    }

    /// Set the fragmentation ratio above which a rebuild runs.
    #[must_use]
    pub const fn with_fragmentation_threshold(mut self, threshold: f64) -> Self {
        self.maintenance.fragmentation_threshold = threshold;
        self
    }

    /// Set the maintenance policy.
    #[must_use]
    pub const fn with_maintenance(mut self, maintenance: MaintenanceConfig) -> Self {
        self.maintenance = maintenance;
        self
    }

    /// Set the storage cache size in bytes.
    #[must_use]
    pub const fn with_cache_size(mut self, bytes: usize) -> Self {
        self.storage.cache_size = Some(bytes);
        self
    }

    /// Check that the settings are usable together.
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::config("dimension must be at least 1"));
        }

        let index = &self.index;
        if index.m < 2 {
            return Err(Error::config(format!("index.m must be at least 2, got {}", index.m)));
        }
        if index.m_max0 < index.m {
            return Err(Error::config(format!(
                "index.m_max0 ({}) must not be below index.m ({})",
                index.m_max0, index.m
            )));
        }
        if index.ef_construction == 0 || index.ef_search == 0 {
            return Err(Error::config("index.ef_construction and index.ef_search must be positive"));
        }

        let (lowest, highest) = match self.metric {
            DistanceMetric::Cosine => (-1.0, 1.0),
            DistanceMetric::Euclidean => (0.0, 1.0),
        };
        if !(lowest..=highest).contains(&self.dedup.threshold) {
            return Err(Error::config(format!(
                "dedup.threshold {} is outside the {} score range [{lowest}, {highest}]",
                self.dedup.threshold, self.metric
            )));
        }
        if self.dedup.k == 0 {
            return Err(Error::config("dedup.k must be at least 1"));
        }

        self.confidence.validate()?;

        let frag = self.maintenance.fragmentation_threshold;
        if !(0.0..1.0).contains(&frag) {
            return Err(Error::config(format!(
                "maintenance.fragmentation_threshold must be in [0, 1), got {frag}"
            )));
        }
        Ok(())
    }

    /// Storage engine options derived from this configuration.
    #[must_use]
    pub fn redb_config(&self) -> RedbConfig {
        match self.storage.cache_size {
            Some(bytes) => RedbConfig::new().cache_size(bytes),
            None => RedbConfig::new(),
        }
    }
}

/// Duplicate grouping settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Neighbors scoring at or above this are grouped with the new entry.
    pub threshold: f32,
    /// Neighbors inspected per ingest, the new entry itself excluded.
    pub k: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { threshold: 0.95, k: 10 }
    }
}

/// Cut points of the confidence bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Scores at or above this are `High`.
    pub high_cut: f32,
    /// Scores at or above this (and below `high_cut`) are `Medium`.
    pub low_cut: f32,
}

impl ConfidenceConfig {
    /// Check that both cuts are finite and ordered.
    pub fn validate(&self) -> Result<()> {
        if !self.high_cut.is_finite() || !self.low_cut.is_finite() {
            return Err(Error::config("confidence cuts must be finite"));
        }
        if self.low_cut > self.high_cut {
            return Err(Error::config(format!(
                "confidence.low_cut ({}) is above confidence.high_cut ({})",
                self.low_cut, self.high_cut
            )));
        }
        Ok(())
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self { high_cut: 0.95, low_cut: 0.8 }
    }
}

/// Fragmentation and rebuild policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Rebuild when `deleted / (active + deleted)` strictly exceeds this.
    pub fragmentation_threshold: f64,
    /// How many times a write that collides with a rebuild is retried.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on every attempt.
    pub retry_backoff_ms: u64,
    /// Run automatic rebuilds on a spawned thread instead of inline.
    pub background_rebuild: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            fragmentation_threshold: 0.3,
            retry_attempts: 5,
            retry_backoff_ms: 10,
            background_rebuild: false,
        }
    }
}

/// Storage engine tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Page cache size in bytes; the engine default when unset.
    pub cache_size: Option<usize>,
}
