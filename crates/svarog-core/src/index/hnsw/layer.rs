//! A single layer in the HNSW hierarchy: one adjacency list per node.
//!
//! Build mutates layers through `&mut self` on the graph, search only reads,
//! so adjacency is plain `Vec`s with no per-node locking.

use serde::{Deserialize, Serialize};

/// Slot index of a node in the graph arena. Stable during build; remapped in
/// one explicit pass by layout reordering.
pub(crate) type NodeId = usize;

/// Adjacency lists for one layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Layer {
    pub(crate) neighbors: Vec<Vec<NodeId>>,
}

impl Layer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Grows the adjacency table so `node_id` has a slot.
    pub(crate) fn ensure_node(&mut self, node_id: NodeId) {
        if self.neighbors.len() <= node_id {
            self.neighbors.resize_with(node_id + 1, Vec::new);
        }
    }

    pub(crate) fn neighbors(&self, node_id: NodeId) -> &[NodeId] {
        self.neighbors.get(node_id).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn set_neighbors(&mut self, node_id: NodeId, neighbors: Vec<NodeId>) {
        self.ensure_node(node_id);
        self.neighbors[node_id] = neighbors;
    }

    pub(crate) fn push_neighbor(&mut self, node_id: NodeId, neighbor: NodeId) {
        self.ensure_node(node_id);
        self.neighbors[node_id].push(neighbor);
    }
}
