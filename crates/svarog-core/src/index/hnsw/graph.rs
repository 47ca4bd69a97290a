//! HNSW graph structure: insertion and layered beam search.
//!
//! Hierarchical navigable small-world graph after Malkov & Yashunin
//! (arXiv:1603.09320). Each node lives in layer 0 and, with exponentially
//! decaying probability, in higher layers. Insertion descends greedily from
//! the entry point, runs a beam of width `ef_construction` per layer, and
//! links to neighbors chosen by the diversity heuristic; search descends the
//! same way and runs one beam of width `max(ef, k)` at layer 0.

use super::layer::{Layer, NodeId};
use crate::distance::DistanceMetric;
use crate::ordered_float::OrderedFloat;
use crate::rng::XorShift64;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Layer draws are capped here; deeper hierarchies buy nothing at the sizes a
/// single process can hold.
const MAX_LEVEL: usize = 16;

/// The graph arena: vector storage, per-layer adjacency, entry point.
///
/// Distances inside the graph are always squared L2 (the ranking metric);
/// the owning index applies the reporting transform at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HnswGraph {
    dim: usize,
    /// Degree cap above layer 0.
    m: usize,
    /// Degree cap at layer 0 (2M).
    m0: usize,
    ef_construction: usize,
    /// 1/ln(M), the exponent multiplier of the layer draw.
    level_mult: f64,
    max_visited: Option<usize>,
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) entry: Option<NodeId>,
    pub(crate) top_layer: usize,
    rng: XorShift64,
}

impl HnswGraph {
    pub(crate) fn new(
        dim: usize,
        m: usize,
        ef_construction: usize,
        seed: u64,
        max_visited: Option<usize>,
    ) -> Self {
        Self {
            dim,
            m,
            m0: m * 2,
            ef_construction,
            level_mult: 1.0 / (m as f64).ln(),
            max_visited,
            vectors: Vec::new(),
            layers: vec![Layer::new()],
            entry: None,
            top_layer: 0,
            rng: XorShift64::new(seed),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.vectors.len()
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    /// Exponentially distributed layer draw, parameterized by M.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn random_level(&mut self) -> usize {
        let uniform = self.rng.next_f64().max(f64::MIN_POSITIVE);
        ((-uniform.ln() * self.level_mult).floor() as usize).min(MAX_LEVEL)
    }

    /// Single-best greedy hop sequence within one layer.
    fn greedy_closest(&self, query: &[f32], entry: NodeId, layer: usize) -> NodeId {
        let mut best = entry;
        let mut best_dist = DistanceMetric::ranking(query, &self.vectors[best]);
        loop {
            let mut improved = false;
            for &nb in self.layers[layer].neighbors(best) {
                let dist = DistanceMetric::ranking(query, &self.vectors[nb]);
                if dist < best_dist {
                    best = nb;
                    best_dist = dist;
                    improved = true;
                }
            }
            if !improved {
                return best;
            }
        }
    }

    /// Beam search within one layer.
    ///
    /// Keeps a bounded frontier of the most promising unvisited candidates and
    /// a result heap of the `ef` closest nodes seen. Stops when the nearest
    /// frontier entry cannot improve the results, or when the visit cap is
    /// hit (partial results).
    fn search_layer(
        &self,
        query: &[f32],
        entries: &[NodeId],
        ef: usize,
        layer: usize,
    ) -> Vec<(NodeId, f32)> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut frontier: BinaryHeap<Reverse<(OrderedFloat, NodeId)>> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat, NodeId)> = BinaryHeap::new();
        let visit_cap = self.max_visited.unwrap_or(usize::MAX);

        for &ep in entries {
            if visited.insert(ep) {
                let dist = DistanceMetric::ranking(query, &self.vectors[ep]);
                frontier.push(Reverse((OrderedFloat(dist), ep)));
                results.push((OrderedFloat(dist), ep));
            }
        }

        while let Some(Reverse((OrderedFloat(dist), node))) = frontier.pop() {
            let furthest = results.peek().map_or(f32::MAX, |r| r.0 .0);
            if dist > furthest && results.len() >= ef {
                break;
            }
            if visited.len() >= visit_cap {
                tracing::debug!(layer, visited = visited.len(), "beam search visit cap hit");
                break;
            }

            for &nb in self.layers[layer].neighbors(node) {
                if visited.insert(nb) {
                    let nb_dist = DistanceMetric::ranking(query, &self.vectors[nb]);
                    let furthest = results.peek().map_or(f32::MAX, |r| r.0 .0);
                    if nb_dist < furthest || results.len() < ef {
                        frontier.push(Reverse((OrderedFloat(nb_dist), nb)));
                        results.push((OrderedFloat(nb_dist), nb));
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }

        let mut out: Vec<(NodeId, f32)> = results.into_iter().map(|(d, n)| (n, d.0)).collect();
        out.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Diversity-aware neighbor selection.
    ///
    /// A candidate is kept only while it is closer to the query than to every
    /// neighbor already selected; this spreads edges across directions
    /// instead of clustering them toward one region. Leftover capacity is
    /// filled with the nearest skipped candidates so low-degree nodes stay
    /// connected.
    fn select_neighbors(&self, candidates: &[(NodeId, f32)], max_neighbors: usize) -> Vec<NodeId> {
        if candidates.len() <= max_neighbors {
            return candidates.iter().map(|&(id, _)| id).collect();
        }

        let mut selected: Vec<NodeId> = Vec::with_capacity(max_neighbors);
        for &(candidate, dist_to_query) in candidates {
            if selected.len() >= max_neighbors {
                break;
            }
            let diverse = selected.iter().all(|&s| {
                dist_to_query < DistanceMetric::ranking(&self.vectors[candidate], &self.vectors[s])
            });
            if diverse || selected.is_empty() {
                selected.push(candidate);
            }
        }

        if selected.len() < max_neighbors {
            for &(candidate, _) in candidates {
                if selected.len() >= max_neighbors {
                    break;
                }
                if !selected.contains(&candidate) {
                    selected.push(candidate);
                }
            }
        }

        selected
    }

    /// Re-prunes an overflowing adjacency list with the same diversity
    /// heuristic used at selection time.
    fn prune_neighbors(&mut self, node: NodeId, layer: usize, max_neighbors: usize) {
        let anchor = self.vectors[node].clone();
        let mut candidates: Vec<(NodeId, f32)> = self.layers[layer]
            .neighbors(node)
            .iter()
            .map(|&nb| (nb, DistanceMetric::ranking(&anchor, &self.vectors[nb])))
            .collect();
        candidates.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let pruned = self.select_neighbors(&candidates, max_neighbors);
        self.layers[layer].set_neighbors(node, pruned);
    }

    /// Inserts one vector, returning its node id.
    ///
    /// Insertion order matters for graph shape; builds are deterministic
    /// given the same order and seed.
    pub(crate) fn insert(&mut self, vector: Vec<f32>) -> NodeId {
        debug_assert_eq!(vector.len(), self.dim);

        let node = self.vectors.len();
        self.vectors.push(vector);
        let level = self.random_level();

        while self.layers.len() <= level {
            self.layers.push(Layer::new());
        }
        for layer in &mut self.layers {
            layer.ensure_node(node);
        }

        let Some(entry) = self.entry else {
            self.entry = Some(node);
            self.top_layer = level;
            return node;
        };

        let query = self.vectors[node].clone();

        // Greedy descent through the layers above the node's top level.
        let mut ep = entry;
        for layer in ((level + 1)..=self.top_layer).rev() {
            ep = self.greedy_closest(&query, ep, layer);
        }

        // Beam + diversity selection from the node's top level down to 0.
        let mut entries = vec![ep];
        for layer in (0..=level.min(self.top_layer)).rev() {
            let candidates = self.search_layer(&query, &entries, self.ef_construction, layer);
            let max_conn = if layer == 0 { self.m0 } else { self.m };
            let selected = self.select_neighbors(&candidates, max_conn);

            self.layers[layer].set_neighbors(node, selected.clone());
            for &nb in &selected {
                self.layers[layer].push_neighbor(nb, node);
                if self.layers[layer].neighbors(nb).len() > max_conn {
                    self.prune_neighbors(nb, layer, max_conn);
                }
            }

            entries = candidates.into_iter().map(|(id, _)| id).collect();
            if entries.is_empty() {
                entries.push(ep);
            }
        }

        if level > self.top_layer {
            self.top_layer = level;
            self.entry = Some(node);
        }

        node
    }

    /// Returns up to `k` nearest nodes with squared distances, nearest first.
    pub(crate) fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(NodeId, f32)> {
        let Some(entry) = self.entry else {
            return Vec::new();
        };

        let mut ep = entry;
        for layer in (1..=self.top_layer).rev() {
            ep = self.greedy_closest(query, ep, layer);
        }

        let mut found = self.search_layer(query, &[ep], ef.max(k), 0);
        found.truncate(k);
        found
    }
}
