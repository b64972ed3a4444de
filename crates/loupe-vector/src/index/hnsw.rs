//! The similarity index.
//!
//! A layered proximity graph (HNSW) over catalog entries with tombstone
//! deletion. Candidate search for an insert runs under the graph's read
//! lock; only linking the new node and pruning its neighbors takes the write
//! lock.

use std::sync::{Mutex, RwLock};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::distance::{l2_norm, DistanceMetric};
use crate::error::VectorError;
use crate::store::VectorSource;
use crate::types::{CatalogId, Embedding};

use super::config::HnswConfig;
use super::graph::{search_layer, select_neighbors, Candidate, HnswGraph, IndexNode, Query};
use super::traits::{ranked, NeighborResult};

/// Highest layer a node can be assigned.
const MAX_LEVEL: usize = 16;

/// Draws node levels from a geometric distribution.
struct LevelGenerator {
    ml: f64,
    rng: StdRng,
}

impl LevelGenerator {
    fn new(ml: f64, seed: u64) -> Self {
        Self { ml, rng: StdRng::seed_from_u64(seed) }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn generate_level(&mut self) -> usize {
        // 1 - u lies in (0, 1], so the logarithm is finite.
        let uniform: f64 = self.rng.gen();
        let level = (-(1.0 - uniform).ln() * self.ml).floor() as usize;
        level.min(MAX_LEVEL)
    }
}

/// Shape of the graph, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    /// All nodes, tombstones included.
    pub nodes: usize,
    /// Live nodes.
    pub live: usize,
    /// Tombstoned nodes.
    pub tombstones: usize,
    /// Level of the entry point.
    pub max_layer: usize,
    /// Largest link count of any node, per layer.
    pub max_degree: Vec<usize>,
}

/// Approximate nearest-neighbor index over catalog entries.
///
/// The index stores no vectors. Every operation that scores takes a
/// [`VectorSource`]; pass the store's view for live operations or an
/// [`EntrySnapshot`](crate::store::EntrySnapshot) while rebuilding.
pub struct SimilarityIndex {
    config: HnswConfig,
    graph: RwLock<HnswGraph>,
    levels: Mutex<LevelGenerator>,
}

impl SimilarityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric, config: HnswConfig) -> Self {
        let levels = LevelGenerator::new(config.ml(), config.seed);
        Self {
            config,
            graph: RwLock::new(HnswGraph::new(dimension, metric)),
            levels: Mutex::new(levels),
        }
    }

    /// Build an index from `entries` in order.
    ///
    /// Node storage is reserved up front; if that fails the error is
    /// [`VectorError::ResourceExhausted`] and nothing is left half-built.
    ///
    /// # Errors
    ///
    /// Allocation failure, or any error of [`insert`](Self::insert).
    pub fn build<'a, S, I>(
        dimension: usize,
        metric: DistanceMetric,
        config: HnswConfig,
        entries: I,
        source: &S,
    ) -> Result<Self, VectorError>
    where
        S: VectorSource + ?Sized,
        I: IntoIterator<Item = (&'a CatalogId, u64)>,
        I::IntoIter: ExactSizeIterator,
    {
        let entries = entries.into_iter();
        let index = Self::new(dimension, metric, config);
        {
            let mut graph = index.graph.write().map_err(|_| VectorError::LockPoisoned)?;
            graph.nodes.try_reserve_exact(entries.len())?;
            graph.live.try_reserve(entries.len())?;
        }
        for (id, inserted_at) in entries {
            index.insert(id, inserted_at, source)?;
        }
        Ok(index)
    }

    /// The index configuration.
    #[must_use]
    pub const fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Add the entry `id` (with its vector read from `source`).
    ///
    /// A live node for the same ID is tombstoned before the new node is
    /// linked.
    ///
    /// # Errors
    ///
    /// - [`VectorError::NotFound`] if `source` has no active vector for `id`
    /// - [`VectorError::DimensionMismatch`] for a vector of the wrong length
    /// - [`VectorError::LockPoisoned`]
    pub fn insert<S: VectorSource + ?Sized>(
        &self,
        id: &CatalogId,
        inserted_at: u64,
        source: &S,
    ) -> Result<(), VectorError> {
        let vector = source.vector(id).ok_or_else(|| VectorError::NotFound(id.to_string()))?;
        let norm = l2_norm(vector);
        let level = self.levels.lock().map_err(|_| VectorError::LockPoisoned)?.generate_level();

        let replaces_live = {
            let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
            if vector.len() != graph.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: graph.dimension,
                    actual: vector.len(),
                });
            }
            graph.live_slot(id).is_some()
        };
        if replaces_live {
            self.graph.write().map_err(|_| VectorError::LockPoisoned)?.tombstone(id);
        }

        let plan = {
            let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
            self.plan_links(&graph, &Query::new(graph.metric, vector), level, source)
        };

        let mut graph = self.graph.write().map_err(|_| VectorError::LockPoisoned)?;
        let slot = graph.push_node(IndexNode::new(id.clone(), inserted_at, level, norm));

        for (layer, neighbors) in plan {
            let neighbors: Vec<usize> =
                neighbors.into_iter().filter(|&n| !graph.nodes[n].tombstoned).collect();
            graph.nodes[slot].set_connections(layer, neighbors.clone());

            let budget = self.config.max_links(layer);
            for neighbor in neighbors {
                graph.nodes[neighbor].add_connection(layer, slot);
                if graph.nodes[neighbor].connections_at(layer).len() > budget {
                    prune(&mut graph, neighbor, layer, budget, source);
                }
            }
        }

        trace!(id = %id, slot, level, "linked index node");
        Ok(())
    }

    /// For each layer the new node will occupy, the neighbors to link.
    fn plan_links<S: VectorSource + ?Sized>(
        &self,
        graph: &HnswGraph,
        query: &Query<'_>,
        level: usize,
        source: &S,
    ) -> Vec<(usize, Vec<usize>)> {
        let Some(mut current) = entry_candidate(graph, query, source) else {
            return Vec::new();
        };

        for layer in (level + 1..=graph.max_layer).rev() {
            let found = search_layer(graph, query, source, &current, 1, layer);
            if !found.is_empty() {
                current = found;
            }
        }

        let mut plan = Vec::with_capacity(level.min(graph.max_layer) + 1);
        for layer in (0..=level.min(graph.max_layer)).rev() {
            let found =
                search_layer(graph, query, source, &current, self.config.ef_construction, layer);
            let neighbors = select_neighbors(graph, source, &found, self.config.max_links(layer));
            plan.push((layer, neighbors));
            if !found.is_empty() {
                current = found;
            }
        }
        plan
    }

    /// Top-`k` live entries closest to `query`, using the configured
    /// `ef_search`.
    ///
    /// # Errors
    ///
    /// See [`query_with_ef`](Self::query_with_ef).
    pub fn query<S: VectorSource + ?Sized>(
        &self,
        query: &Embedding,
        k: usize,
        source: &S,
    ) -> Result<Vec<NeighborResult>, VectorError> {
        self.query_with_ef(query, k, None, source)
    }

    /// Top-`k` live entries closest to `query`.
    ///
    /// The layer-0 beam is `max(ef, k)` wide, with `ef` defaulting to the
    /// configured `ef_search`. Results are ordered by descending score, ties
    /// going to the earlier insertion. An index with no live nodes answers
    /// with an empty list.
    ///
    /// # Errors
    ///
    /// - [`VectorError::InvalidK`] if `k == 0`
    /// - [`VectorError::DimensionMismatch`] for a query of the wrong length
    /// - [`VectorError::ZeroVector`] for a zero query under cosine
    /// - [`VectorError::LockPoisoned`]
    pub fn query_with_ef<S: VectorSource + ?Sized>(
        &self,
        query: &Embedding,
        k: usize,
        ef: Option<usize>,
        source: &S,
    ) -> Result<Vec<NeighborResult>, VectorError> {
        if k == 0 {
            return Err(VectorError::InvalidK(k));
        }
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        if query.dimension() != graph.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: graph.dimension,
                actual: query.dimension(),
            });
        }
        if graph.metric.requires_direction() && query.is_zero() {
            return Err(VectorError::ZeroVector { metric: graph.metric });
        }

        let prepared = Query::new(graph.metric, query.as_slice());
        let Some(mut current) = entry_candidate(&graph, &prepared, source) else {
            return Ok(Vec::new());
        };

        for layer in (1..=graph.max_layer).rev() {
            let found = search_layer(&graph, &prepared, source, &current, 1, layer);
            if !found.is_empty() {
                current = found;
            }
        }

        let ef = ef.unwrap_or(self.config.ef_search).max(k);
        let found = search_layer(&graph, &prepared, source, &current, ef, 0);

        Ok(ranked(found.into_iter().take(k).map(|c| (graph.nodes[c.slot].id.clone(), c.score))))
    }

    /// Tombstone the live node for `id`. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn remove(&self, id: &CatalogId) -> Result<bool, VectorError> {
        let mut graph = self.graph.write().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.tombstone(id))
    }

    /// Whether `id` has a live node.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn contains(&self, id: &CatalogId) -> Result<bool, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.live_slot(id).is_some())
    }

    /// Number of nodes, tombstones included.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn len(&self) -> Result<usize, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.nodes.len())
    }

    /// Whether the index has no live nodes.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, VectorError> {
        Ok(self.live_len()? == 0)
    }

    /// Number of live nodes.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn live_len(&self) -> Result<usize, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.live_len())
    }

    /// Number of tombstoned nodes.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn tombstone_count(&self) -> Result<usize, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.tombstone_count())
    }

    /// The vector dimension.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn dimension(&self) -> Result<usize, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.dimension)
    }

    /// The similarity metric.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn metric(&self) -> Result<DistanceMetric, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        Ok(graph.metric)
    }

    /// Node counts and link degrees.
    ///
    /// # Errors
    ///
    /// Returns [`VectorError::LockPoisoned`] if the graph lock is poisoned.
    pub fn stats(&self) -> Result<IndexStats, VectorError> {
        let graph = self.graph.read().map_err(|_| VectorError::LockPoisoned)?;
        let mut max_degree = Vec::new();
        for node in graph.nodes.iter().filter(|n| !n.tombstoned) {
            for (layer, links) in node.connections.iter().enumerate() {
                if max_degree.len() <= layer {
                    max_degree.resize(layer + 1, 0);
                }
                max_degree[layer] = max_degree[layer].max(links.len());
            }
        }
        Ok(IndexStats {
            nodes: graph.nodes.len(),
            live: graph.live_len(),
            tombstones: graph.tombstone_count(),
            max_layer: graph.max_layer,
            max_degree,
        })
    }
}

impl std::fmt::Debug for SimilarityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityIndex").field("config", &self.config).finish_non_exhaustive()
    }
}

fn entry_candidate<S: VectorSource + ?Sized>(
    graph: &HnswGraph,
    query: &Query<'_>,
    source: &S,
) -> Option<Vec<Candidate>> {
    let entry = graph.entry_point?;
    Candidate::scored(graph, query, entry, source).map(|c| vec![c])
}

/// Cut a node's links on `layer` back to `budget`, dropping links to
/// tombstones first.
fn prune<S: VectorSource + ?Sized>(
    graph: &mut HnswGraph,
    slot: usize,
    layer: usize,
    budget: usize,
    source: &S,
) {
    let mut scored: Vec<Candidate> = graph.nodes[slot]
        .connections_at(layer)
        .iter()
        .filter(|&&n| !graph.nodes[n].tombstoned)
        .filter_map(|&n| {
            graph.score_between(slot, n, source).map(|score| Candidate {
                slot: n,
                score,
                inserted_at: graph.nodes[n].inserted_at,
            })
        })
        .collect();
    scored.sort_unstable_by(|a, b| b.cmp(a));

    let kept = select_neighbors(graph, source, &scored, budget);
    graph.nodes[slot].set_connections(layer, kept);
}
