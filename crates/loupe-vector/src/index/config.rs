//! Similarity index configuration.

use serde::{Deserialize, Serialize};

/// Parameters of the layered proximity graph.
///
/// * `m` - Maximum links per node on layers above 0. Higher values give
///   better recall at the cost of memory.
/// * `m_max0` - Maximum links per node on layer 0, typically `2 * m`.
/// * `ef_construction` - Beam width while linking a new node.
/// * `ef_search` - Default beam width for queries; a query always searches
///   at least `k` candidates.
/// * `seed` - Seed of the level generator, so the same insert sequence builds
///   the same graph.
///
/// The level multiplier is derived from `m` (see [`ml`](Self::ml)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Maximum number of connections per node (M parameter).
    pub m: usize,
    /// Maximum connections in layer 0 (typically 2 * M).
    pub m_max0: usize,
    /// Beam width for construction.
    pub ef_construction: usize,
    /// Default beam width for search.
    pub ef_search: usize,
    /// Level generator seed.
    pub seed: u64,
}

impl HnswConfig {
    /// Create a configuration with the given M.
    ///
    /// Other parameters default to `m_max0 = 2 * m`, `ef_construction = 200`,
    /// `ef_search = 64` and `seed = 0x5EED`.
    #[must_use]
    pub fn new(m: usize) -> Self {
        let m = m.max(2);
        Self { m, m_max0: m * 2, ef_construction: 200, ef_search: 64, seed: 0x5EED }
    }

    /// Level multiplier `1 / ln(m)`; a node reaches layer `l + 1` with
    /// probability `1 / m`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ml(&self) -> f64 {
        1.0 / (self.m.max(2) as f64).ln()
    }

    /// Link budget for a layer.
    #[inline]
    #[must_use]
    pub const fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m
        }
    }

    /// Set the beam width for construction.
    #[must_use]
    pub const fn with_ef_construction(mut self, ef: usize) -> Self {
        self.ef_construction = ef;
        self
    }

    /// Set the default beam width for search.
    #[must_use]
    pub const fn with_ef_search(mut self, ef: usize) -> Self {
        self.ef_search = ef;
        self
    }

    /// Set the maximum connections in layer 0.
    #[must_use]
    pub const fn with_m_max0(mut self, m_max0: usize) -> Self {
        self.m_max0 = m_max0;
        self
    }

    /// Set the level generator seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HnswConfig::default();
        assert_eq!(config.m, 16);
        assert_eq!(config.m_max0, 32);
        assert_eq!(config.ef_construction, 200);
        assert_eq!(config.ef_search, 64);
        assert!((config.ml() - 1.0 / 16_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn builders() {
        let config = HnswConfig::new(8)
            .with_ef_construction(100)
            .with_ef_search(20)
            .with_m_max0(24)
            .with_seed(7);
        assert_eq!(config.m, 8);
        assert_eq!(config.max_links(0), 24);
        assert_eq!(config.max_links(3), 8);
        assert_eq!(config.ef_construction, 100);
        assert_eq!(config.ef_search, 20);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn minimum_m() {
        assert_eq!(HnswConfig::new(1).m, 2);
    }
}
