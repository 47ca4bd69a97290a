//! HNSW (Hierarchical Navigable Small World) index.
//!
//! The most involved of the three variants: a multi-layer proximity graph
//! with tunable construction (`m`, `ef_construction`) and search
//! (`ef_search`) beam widths, plus a post-build BFS layout reorder pass that
//! improves cache locality and emits an id-mapping artifact.
//!
//! # Module organization
//!
//! - `params`: construction/search parameters
//! - `layer`: per-layer adjacency arena
//! - `graph`: insertion and layered beam search
//! - `reorder`: BFS relabeling pass and the [`LayoutMapping`] artifact
//! - `index`: the public [`HnswIndex`] handle

mod graph;
pub(crate) mod index;
pub(crate) mod layer;
mod params;
pub(crate) mod reorder;


pub use index::HnswIndex;
pub use params::HnswParams;
pub use reorder::LayoutMapping;

pub(crate) use graph::HnswGraph;
