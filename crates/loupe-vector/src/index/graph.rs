//! Proximity graph data structure and layer search.
//!
//! Nodes live in a slot vector and link to each other by slot. A node never
//! holds its vector: scoring goes through a [`VectorSource`], and only the L2
//! norm is cached per node. Retired nodes stay in place as tombstones until
//! the whole graph is rebuilt.

use std::borrow::Cow;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::distance::DistanceMetric;
use crate::store::VectorSource;
use crate::types::CatalogId;

/// A slot of the graph.
#[derive(Debug, Clone)]
pub struct IndexNode {
    /// The catalog entry this node stands for.
    pub id: CatalogId,
    /// Insertion counter of that entry, the tie-breaker for equal scores.
    pub inserted_at: u64,
    /// Highest layer the node appears on.
    pub level: usize,
    /// Cached L2 norm of the entry's vector.
    pub norm: f32,
    /// `connections[layer]` = neighbor slots on that layer.
    pub connections: Vec<Vec<usize>>,
    /// Set once the node is retired.
    pub tombstoned: bool,
}

impl IndexNode {
    /// Create an unlinked node.
    #[must_use]
    pub fn new(id: CatalogId, inserted_at: u64, level: usize, norm: f32) -> Self {
        Self {
            id,
            inserted_at,
            level,
            norm,
            connections: vec![Vec::new(); level + 1],
            tombstoned: false,
        }
    }

    /// Neighbor slots on a layer.
    #[inline]
    #[must_use]
    pub fn connections_at(&self, layer: usize) -> &[usize] {
        self.connections.get(layer).map_or(&[], Vec::as_slice)
    }

    /// Add a link on a layer, ignoring duplicates.
    #[inline]
    pub fn add_connection(&mut self, layer: usize, neighbor: usize) {
        if let Some(links) = self.connections.get_mut(layer) {
            if !links.contains(&neighbor) {
                links.push(neighbor);
            }
        }
    }

    /// Replace the links on a layer.
    #[inline]
    pub fn set_connections(&mut self, layer: usize, neighbors: Vec<usize>) {
        if let Some(links) = self.connections.get_mut(layer) {
            *links = neighbors;
        }
    }
}

/// The layered graph.
#[derive(Debug)]
pub struct HnswGraph {
    /// Every node ever inserted, live or tombstoned.
    pub nodes: Vec<IndexNode>,
    /// Slot of the live node for each catalog ID.
    pub live: HashMap<CatalogId, usize>,
    /// A live node on the highest layer, if any node is live.
    pub entry_point: Option<usize>,
    /// Level of the entry point.
    pub max_layer: usize,
    /// Similarity metric of the graph.
    pub metric: DistanceMetric,
    /// Dimension of every vector in the graph.
    pub dimension: usize,
}

impl HnswGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            nodes: Vec::new(),
            live: HashMap::new(),
            entry_point: None,
            max_layer: 0,
            metric,
            dimension,
        }
    }

    /// Slot of the live node for `id`.
    #[inline]
    #[must_use]
    pub fn live_slot(&self, id: &CatalogId) -> Option<usize> {
        self.live.get(id).copied()
    }

    /// Number of live nodes.
    #[inline]
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    /// Number of tombstoned nodes.
    #[inline]
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.nodes.len() - self.live.len()
    }

    /// Append a node, making it the entry point if it tops the graph.
    pub fn push_node(&mut self, node: IndexNode) -> usize {
        let slot = self.nodes.len();
        let level = node.level;
        self.live.insert(node.id.clone(), slot);
        self.nodes.push(node);

        if self.entry_point.is_none() || level > self.max_layer {
            self.entry_point = Some(slot);
            self.max_layer = level;
        }
        slot
    }

    /// Tombstone the live node for `id`. Returns `false` if there was none.
    pub fn tombstone(&mut self, id: &CatalogId) -> bool {
        let Some(slot) = self.live.remove(id) else {
            return false;
        };
        self.nodes[slot].tombstoned = true;
        if self.entry_point == Some(slot) {
            self.elect_entry_point();
        }
        true
    }

    /// Choose a live node on the highest populated layer as the entry point.
    fn elect_entry_point(&mut self) {
        let elected = self
            .live
            .values()
            .map(|&slot| (self.nodes[slot].level, Reverse(slot)))
            .max()
            .map(|(level, Reverse(slot))| (slot, level));

        match elected {
            Some((slot, level)) => {
                self.entry_point = Some(slot);
                self.max_layer = level;
            }
            None => {
                self.entry_point = None;
                self.max_layer = 0;
            }
        }
    }

    /// Similarity between two nodes, if both are live in `source`.
    pub fn score_between<S: VectorSource + ?Sized>(
        &self,
        a: usize,
        b: usize,
        source: &S,
    ) -> Option<f32> {
        let (na, nb) = (&self.nodes[a], &self.nodes[b]);
        let va = source.vector(&na.id)?;
        let vb = source.vector(&nb.id)?;
        Some(self.metric.score_with_norms(va, vb, na.norm, nb.norm))
    }
}

/// A query vector prepared for repeated scoring.
///
/// Under cosine the vector is normalized once, so each node costs one dot
/// product and a division by its cached norm.
#[derive(Debug)]
pub struct Query<'a> {
    metric: DistanceMetric,
    vector: Cow<'a, [f32]>,
    norm: f32,
}

impl<'a> Query<'a> {
    /// Prepare `vector` for scoring under `metric`.
    #[must_use]
    pub fn new(metric: DistanceMetric, vector: &'a [f32]) -> Self {
        let norm = crate::distance::l2_norm(vector);
        match metric {
            DistanceMetric::Cosine if norm > 0.0 => Self {
                metric,
                vector: Cow::Owned(vector.iter().map(|x| x / norm).collect()),
                norm: 1.0,
            },
            _ => Self { metric, vector: Cow::Borrowed(vector), norm },
        }
    }

    /// Score a node, or `None` if its entry is not active in `source`.
    #[inline]
    pub fn score<S: VectorSource + ?Sized>(&self, node: &IndexNode, source: &S) -> Option<f32> {
        let v = source.vector(&node.id)?;
        Some(self.metric.score_with_norms(&self.vector, v, self.norm, node.norm))
    }
}

/// A scored node during search.
///
/// Ordered so that the *better* candidate is greater: higher score first,
/// then the earlier insertion.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Node slot.
    pub slot: usize,
    /// Similarity to the search target.
    pub score: f32,
    /// Insertion counter of the node's entry.
    pub inserted_at: u64,
}

impl Candidate {
    /// Score a node of `graph` as a candidate.
    #[inline]
    pub fn scored<S: VectorSource + ?Sized>(
        graph: &HnswGraph,
        query: &Query<'_>,
        slot: usize,
        source: &S,
    ) -> Option<Self> {
        let node = &graph.nodes[slot];
        if node.tombstoned {
            return None;
        }
        let score = query.score(node, source)?;
        Some(Self { slot, score, inserted_at: node.inserted_at })
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.inserted_at.cmp(&self.inserted_at))
            .then_with(|| other.slot.cmp(&self.slot))
    }
}

/// Best-first search of one layer.
///
/// Returns up to `ef` live candidates, best first. Tombstoned nodes are
/// neither scored nor expanded. The search stops when the best unexpanded
/// candidate cannot beat the worst kept result.
pub fn search_layer<S: VectorSource + ?Sized>(
    graph: &HnswGraph,
    query: &Query<'_>,
    source: &S,
    entry_points: &[Candidate],
    ef: usize,
    layer: usize,
) -> Vec<Candidate> {
    let ef = ef.max(1);
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut results: BinaryHeap<Reverse<Candidate>> = BinaryHeap::new();
    let mut visited: HashSet<usize> = HashSet::new();

    for &ep in entry_points {
        if visited.insert(ep.slot) {
            candidates.push(ep);
            results.push(Reverse(ep));
            if results.len() > ef {
                results.pop();
            }
        }
    }

    while let Some(current) = candidates.pop() {
        if let Some(Reverse(worst)) = results.peek() {
            if results.len() >= ef && current < *worst {
                break;
            }
        }

        for &neighbor in graph.nodes[current.slot].connections_at(layer) {
            if !visited.insert(neighbor) {
                continue;
            }
            let Some(candidate) = Candidate::scored(graph, query, neighbor, source) else {
                continue;
            };

            let improves = match results.peek() {
                Some(Reverse(worst)) => results.len() < ef || candidate > *worst,
                None => true,
            };
            if improves {
                candidates.push(candidate);
                results.push(Reverse(candidate));
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    let mut found: Vec<Candidate> = results.into_iter().map(|Reverse(c)| c).collect();
    found.sort_unstable_by(|a, b| b.cmp(a));
    found
}

/// Pick up to `m` neighbors from `candidates` (best first), preferring
/// diversity.
///
/// A candidate is kept when it is closer to the target than to every
/// neighbor already kept; the remaining slots are filled with the closest
/// discarded candidates.
pub fn select_neighbors<S: VectorSource + ?Sized>(
    graph: &HnswGraph,
    source: &S,
    candidates: &[Candidate],
    m: usize,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(m);
    let mut discarded: Vec<usize> = Vec::new();

    for candidate in candidates {
        if selected.len() >= m {
            break;
        }
        let diverse = selected.iter().all(|&kept| {
            graph
                .score_between(candidate.slot, kept, source)
                .map_or(true, |between| between <= candidate.score)
        });
        if diverse {
            selected.push(candidate.slot);
        } else {
            discarded.push(candidate.slot);
        }
    }

    for slot in discarded {
        if selected.len() >= m {
            break;
        }
        selected.push(slot);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntrySnapshot;
    use crate::store::CatalogEntry;
    use crate::types::Embedding;

    fn snapshot(vectors: &[(&str, [f32; 2])]) -> EntrySnapshot {
        let entries = vectors
            .iter()
            .enumerate()
            .map(|(i, (id, v))| CatalogEntry {
                id: CatalogId::new(*id).unwrap(),
                vector: Embedding::new(v.to_vec()).unwrap(),
                active: true,
                inserted_at: i as u64,
            })
            .collect();
        EntrySnapshot::new(entries).unwrap()
    }

    fn node(id: &str, inserted_at: u64, level: usize) -> IndexNode {
        IndexNode::new(CatalogId::new(id).unwrap(), inserted_at, level, 1.0)
    }

    #[test]
    fn node_connections() {
        let mut n = node("a", 0, 1);
        n.add_connection(0, 2);
        n.add_connection(0, 3);
        n.add_connection(0, 2);
        n.add_connection(1, 4);
        n.add_connection(5, 9);

        assert_eq!(n.connections_at(0), &[2, 3]);
        assert_eq!(n.connections_at(1), &[4]);
        assert!(n.connections_at(5).is_empty());
    }

    #[test]
    fn entry_point_follows_highest_live_level() {
        let mut graph = HnswGraph::new(2, DistanceMetric::Euclidean);
        graph.push_node(node("a", 0, 2));
        graph.push_node(node("b", 1, 1));
        graph.push_node(node("c", 2, 1));
        assert_eq!(graph.entry_point, Some(0));
        assert_eq!(graph.max_layer, 2);

        assert!(graph.tombstone(&CatalogId::new("a").unwrap()));
        assert_eq!(graph.entry_point, Some(1));
        assert_eq!(graph.max_layer, 1);
        assert_eq!(graph.tombstone_count(), 1);

        assert!(!graph.tombstone(&CatalogId::new("a").unwrap()));
        graph.tombstone(&CatalogId::new("b").unwrap());
        graph.tombstone(&CatalogId::new("c").unwrap());
        assert_eq!(graph.entry_point, None);
        assert_eq!(graph.live_len(), 0);
    }

    #[test]
    fn candidate_ordering_breaks_ties_by_insertion() {
        let early = Candidate { slot: 5, score: 0.5, inserted_at: 1 };
        let late = Candidate { slot: 2, score: 0.5, inserted_at: 9 };
        let best = Candidate { slot: 7, score: 0.9, inserted_at: 20 };

        let mut heap = BinaryHeap::from(vec![late, best, early]);
        assert_eq!(heap.pop().unwrap().slot, 7);
        assert_eq!(heap.pop().unwrap().slot, 5);
        assert_eq!(heap.pop().unwrap().slot, 2);
    }

    #[test]
    fn search_layer_skips_tombstones() {
        let source = snapshot(&[("a", [1.0, 0.0]), ("b", [0.9, 0.1]), ("c", [0.0, 1.0])]);
        let mut graph = HnswGraph::new(2, DistanceMetric::Cosine);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let n = IndexNode::new(
                CatalogId::new(*id).unwrap(),
                i as u64,
                0,
                crate::distance::l2_norm(source.vector(&CatalogId::new(*id).unwrap()).unwrap()),
            );
            graph.push_node(n);
        }
        for slot in 0..3 {
            for other in 0..3 {
                if slot != other {
                    graph.nodes[slot].add_connection(0, other);
                }
            }
        }
        graph.tombstone(&CatalogId::new("b").unwrap());

        let target = [1.0, 0.05];
        let query = Query::new(DistanceMetric::Cosine, &target);
        let entry = Candidate::scored(&graph, &query, 2, &source).unwrap();
        let found = search_layer(&graph, &query, &source, &[entry], 10, 0);

        let slots: Vec<usize> = found.iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn select_neighbors_prefers_diversity() {
        // "b" hides behind "a"; "c" covers another direction.
        let source = snapshot(&[("a", [1.0, 0.0]), ("b", [0.99, 0.01]), ("c", [0.6, 0.8])]);
        let mut graph = HnswGraph::new(2, DistanceMetric::Cosine);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            let v = source.vector(&CatalogId::new(*id).unwrap()).unwrap();
            graph.push_node(IndexNode::new(
                CatalogId::new(*id).unwrap(),
                i as u64,
                0,
                crate::distance::l2_norm(v),
            ));
        }

        let target = [0.95, 0.3];
        let query = Query::new(DistanceMetric::Cosine, &target);
        let mut candidates: Vec<Candidate> =
            (0..3).filter_map(|s| Candidate::scored(&graph, &query, s, &source)).collect();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        let picked = select_neighbors(&graph, &source, &candidates, 2);
        assert_eq!(picked.len(), 2);
        assert!(picked.contains(&2), "diverse candidate should be kept: {picked:?}");

        let all = select_neighbors(&graph, &source, &candidates, 3);
        assert_eq!(all.len(), 3);
    }
}
