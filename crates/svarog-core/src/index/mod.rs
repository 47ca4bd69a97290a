//! Index variants and the shared capability trait.
//!
//! Three index kinds share one external contract (build, search, batched
//! search, save) and differ only internally:
//!
//! - [`kdtree::KdTreeIndex`] — exact, tree-based spatial partitioning
//! - [`ivf::IvfFlatIndex`] — inverted-file index over a k-means quantizer
//! - [`hnsw::HnswIndex`] — hierarchical navigable small-world graph
//!
//! The [`Index`] enum is the tagged form used by persistence and by callers
//! that select a variant at run time.

pub mod hnsw;
pub mod ivf;
pub mod kdtree;

#[cfg(test)]
mod ivf_tests;
#[cfg(test)]
mod kdtree_tests;

use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;
use std::path::Path;

/// One search hit: an id and its distance to the query.
///
/// The id is an original dataset id, unless the index has been layout-reordered
/// (HNSW only), in which case it is an internal id that callers translate via
/// the layout mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Vector id in the currently active id space.
    pub id: u64,
    /// Distance to the query under the index's metric.
    pub distance: f32,
}

/// Which index variant a handle or persisted file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Hierarchical navigable small-world graph.
    Hnsw,
    /// Inverted-file index with flat (uncompressed) vectors.
    IvfFlat,
    /// Exact k-d tree.
    KdTree,
}

impl IndexKind {
    /// Stable on-disk tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Hnsw => 1,
            Self::IvfFlat => 2,
            Self::KdTree => 3,
        }
    }

    /// Reverse of [`IndexKind::tag`].
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Hnsw),
            2 => Some(Self::IvfFlat),
            3 => Some(Self::KdTree),
            _ => None,
        }
    }
}

/// Capability contract shared by all index variants.
///
/// An index is built once via [`VectorIndex::build`] and read-only afterwards
/// (HNSW layout reordering is the one documented exception). Searches take
/// `&self` and may run concurrently from many threads.
pub trait VectorIndex: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> IndexKind;

    /// Vector dimension the index was constructed with.
    fn dimension(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Returns true if no vectors have been indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bulk-builds the index over a dataset, consuming it.
    ///
    /// # Errors
    ///
    /// Fails on dimension mismatch, or when variant parameters cannot be
    /// satisfied by the dataset (e.g. `nlist` larger than the vector count).
    fn build(&mut self, dataset: Dataset) -> Result<()>;

    /// Returns the `k` nearest neighbors of `query`, nearest first.
    ///
    /// Returns at most `min(k, len)` results, sorted by non-decreasing
    /// distance with ties broken by id. An empty index yields an empty
    /// result, not an error.
    ///
    /// # Errors
    ///
    /// Fails if `k` is zero or the query dimension does not match.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    /// Searches many independent queries across the rayon worker pool.
    ///
    /// # Errors
    ///
    /// Same conditions as [`VectorIndex::search`]; the first failing query
    /// aborts the batch.
    fn search_batch(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<Neighbor>>> {
        queries.par_iter().map(|q| self.search(q, k)).collect()
    }

    /// Persists the index to `path` atomically (temp file + rename).
    ///
    /// # Errors
    ///
    /// Fails on IO or serialization errors; no partial file is left behind.
    fn save(&self, path: &Path) -> Result<()>;
}

/// Construction parameters, tagged by variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IndexParams {
    /// HNSW graph parameters.
    Hnsw(hnsw::HnswParams),
    /// IVF quantizer parameters.
    IvfFlat(ivf::IvfParams),
    /// KDTree parameters.
    KdTree(kdtree::KdTreeParams),
}

/// A tagged index handle over the three variants.
#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
pub enum Index {
    /// HNSW graph index.
    Hnsw(hnsw::HnswIndex),
    /// Inverted-file index.
    IvfFlat(ivf::IvfFlatIndex),
    /// Exact k-d tree index.
    KdTree(kdtree::KdTreeIndex),
}

impl Index {
    /// Constructs an empty index of the requested variant.
    ///
    /// # Errors
    ///
    /// Fails if `dim` is zero or the variant parameters are invalid.
    pub fn new(dim: usize, metric: DistanceMetric, params: IndexParams) -> Result<Self> {
        Ok(match params {
            IndexParams::Hnsw(p) => Self::Hnsw(hnsw::HnswIndex::new(dim, metric, p)?),
            IndexParams::IvfFlat(p) => Self::IvfFlat(ivf::IvfFlatIndex::new(dim, metric, p)?),
            IndexParams::KdTree(p) => Self::KdTree(kdtree::KdTreeIndex::new(dim, metric, p)?),
        })
    }

    /// Borrows the HNSW variant, if that is what this handle holds.
    #[must_use]
    pub fn as_hnsw(&self) -> Option<&hnsw::HnswIndex> {
        match self {
            Self::Hnsw(idx) => Some(idx),
            _ => None,
        }
    }

    /// Mutably borrows the HNSW variant, if that is what this handle holds.
    pub fn as_hnsw_mut(&mut self) -> Option<&mut hnsw::HnswIndex> {
        match self {
            Self::Hnsw(idx) => Some(idx),
            _ => None,
        }
    }

    /// Borrows the IVF variant, if that is what this handle holds.
    #[must_use]
    pub fn as_ivf(&self) -> Option<&ivf::IvfFlatIndex> {
        match self {
            Self::IvfFlat(idx) => Some(idx),
            _ => None,
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $idx:ident => $body:expr) => {
        match $self {
            Index::Hnsw($idx) => $body,
            Index::IvfFlat($idx) => $body,
            Index::KdTree($idx) => $body,
        }
    };
}

impl VectorIndex for Index {
    fn kind(&self) -> IndexKind {
        dispatch!(self, idx => idx.kind())
    }

    fn dimension(&self) -> usize {
        dispatch!(self, idx => idx.dimension())
    }

    fn len(&self) -> usize {
        dispatch!(self, idx => idx.len())
    }

    fn build(&mut self, dataset: Dataset) -> Result<()> {
        dispatch!(self, idx => idx.build(dataset))
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        dispatch!(self, idx => idx.search(query, k))
    }

    fn search_batch(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<Neighbor>>> {
        dispatch!(self, idx => idx.search_batch(queries, k))
    }

    fn save(&self, path: &Path) -> Result<()> {
        dispatch!(self, idx => idx.save(path))
    }
}

/// Validates the common search preconditions shared by all variants.
pub(crate) fn validate_search(dim: usize, query: &[f32], k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::invalid_parameter("k", "must be at least 1"));
    }
    if query.len() != dim {
        return Err(Error::DimensionMismatch {
            expected: dim,
            actual: query.len(),
        });
    }
    Ok(())
}

/// Bounded max-heap of the current k best candidates.
///
/// Eviction compares `(distance, id)`, so among equal distances the larger id
/// is evicted first and results stay deterministic.
pub(crate) struct TopK {
    heap: BinaryHeap<(OrderedFloat, u64)>,
    k: usize,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
        }
    }

    /// Current k-th best distance, or `f32::MAX` while under capacity.
    pub(crate) fn threshold(&self) -> f32 {
        if self.heap.len() < self.k {
            f32::MAX
        } else {
            self.heap.peek().map_or(f32::MAX, |(d, _)| d.0)
        }
    }

    pub(crate) fn push(&mut self, distance: f32, id: u64) {
        if self.heap.len() < self.k {
            self.heap.push((OrderedFloat(distance), id));
        } else if let Some(&(worst, worst_id)) = self.heap.peek() {
            if (OrderedFloat(distance), id) < (worst, worst_id) {
                self.heap.pop();
                self.heap.push((OrderedFloat(distance), id));
            }
        }
    }

    /// Drains into neighbors sorted by `(distance, id)`, applying the metric's
    /// reporting transform.
    pub(crate) fn into_neighbors(self, metric: DistanceMetric) -> Vec<Neighbor> {
        let mut pairs: Vec<(OrderedFloat, u64)> = self.heap.into_vec();
        pairs.sort_unstable();
        pairs
            .into_iter()
            .map(|(d, id)| Neighbor {
                id,
                distance: metric.finalize(d.0),
            })
            .collect()
    }
}
