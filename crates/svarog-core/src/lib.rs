//! # Svarog Core
//!
//! In-process approximate/exact nearest neighbor index engine.
//!
//! Three index variants share one contract (build, search, batched search,
//! persistence) and differ internally:
//!
//! - **HNSW**: hierarchical navigable small-world graph, tunable via
//!   `ef_search`, with a post-build BFS layout reorder for cache locality
//! - **IVFFlat**: k-means coarse quantizer plus inverted lists, tunable via
//!   `nprobe`
//! - **KDTree**: exact spatial partitioning for low-to-moderate dimensions
//!
//! ## Quick start
//!
//! ```rust
//! use svarog_core::{Dataset, DistanceMetric, HnswParams, Index, IndexParams, VectorIndex};
//!
//! # fn main() -> svarog_core::Result<()> {
//! let vectors = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
//! let dataset = Dataset::from_vectors(2, vectors)?;
//!
//! let mut index = Index::new(
//!     2,
//!     DistanceMetric::SquaredEuclidean,
//!     IndexParams::Hnsw(HnswParams::default()),
//! )?;
//! index.build(dataset)?;
//!
//! let hits = index.search(&[0.9, 0.9], 2)?;
//! assert_eq!(hits[0].id, 2);
//! # Ok(())
//! # }
//! ```
//!
//! Builds are deterministic: all randomness (HNSW layer draws, k-means
//! seeding) comes from explicit seed parameters, never hidden global state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]

pub mod config;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod index;
pub mod io;
pub mod persistence;
pub mod recall;
pub mod simd;

mod ordered_float;
mod rng;

#[cfg(test)]
mod dataset_tests;
#[cfg(test)]
mod error_tests;

pub use config::{EngineConfig, SearchMode};
pub use dataset::Dataset;
pub use distance::DistanceMetric;
pub use error::{Error, Result};
pub use index::hnsw::{HnswIndex, HnswParams, LayoutMapping};
pub use index::ivf::{IvfFlatIndex, IvfParams};
pub use index::kdtree::{KdTreeIndex, KdTreeParams};
pub use index::{Index, IndexKind, IndexParams, Neighbor, VectorIndex};
pub use persistence::{read_index, write_index};
pub use recall::{compute_recall_with_mapping, recall_at_k};
