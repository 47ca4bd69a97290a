//! Exact k-d tree index.
//!
//! Recursive spatial partitioning along the axis of greatest spread, median
//! split, leaf-size cutoff. Search walks toward the query's partition and
//! backtracks with a bounded max-heap, pruning subtrees whose splitting
//! hyperplane is already farther away than the current k-th best distance.
//! Results are exact under the configured metric.
//!
//! Performance is sublinear in low dimension and degrades toward a linear
//! scan as the dimension grows; that is a property of the structure, not a
//! defect.

use super::{validate_search, IndexKind, Neighbor, TopK, VectorIndex};
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ranges below this size are built sequentially instead of via `rayon::join`.
const PARALLEL_BUILD_CUTOFF: usize = 4096;

/// KDTree construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdTreeParams {
    /// Partitioning stops once a range holds at most this many points.
    pub leaf_size: usize,
}

impl Default for KdTreeParams {
    fn default() -> Self {
        Self { leaf_size: 16 }
    }
}

impl KdTreeParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(Error::invalid_parameter("leaf_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Arena node. Leaves reference a contiguous range of the permuted id array.
#[derive(Debug, Clone)]
enum Node {
    Split {
        axis: usize,
        value: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        start: usize,
        end: usize,
    },
}

/// Exact k-nearest-neighbor index over a k-d tree.
#[derive(Debug)]
pub struct KdTreeIndex {
    dim: usize,
    metric: DistanceMetric,
    params: KdTreeParams,
    pub(crate) vectors: Vec<Vec<f32>>,
    ids: Vec<u32>,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTreeIndex {
    /// Creates an empty KDTree index.
    ///
    /// # Errors
    ///
    /// Fails if `dim` is zero or the parameters are invalid.
    pub fn new(dim: usize, metric: DistanceMetric, params: KdTreeParams) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_parameter("dim", "must be at least 1"));
        }
        params.validate()?;
        Ok(Self {
            dim,
            metric,
            params,
            vectors: Vec::new(),
            ids: Vec::new(),
            nodes: Vec::new(),
            root: None,
        })
    }

    /// The metric this index reports distances in.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Construction parameters.
    #[must_use]
    pub fn params(&self) -> KdTreeParams {
        self.params
    }

    fn knn(&self, node: usize, query: &[f32], top: &mut TopK) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &id in &self.ids[start..end] {
                    let dist = DistanceMetric::ranking(query, &self.vectors[id as usize]);
                    top.push(dist, u64::from(id));
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let diff = query[axis] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.knn(near, query, top);
                if diff * diff < top.threshold() {
                    self.knn(far, query, top);
                }
            }
        }
    }
}

/// Builds a subtree over `ids`, returning an arena whose root is the last
/// element. `base` is the global offset of `ids` within the full id array, so
/// leaf ranges stay valid after sub-arenas are merged.
fn build_range(
    data: &[Vec<f32>],
    ids: &mut [u32],
    base: usize,
    leaf_size: usize,
) -> Vec<Node> {
    let n = ids.len();
    if n <= leaf_size {
        return vec![Node::Leaf {
            start: base,
            end: base + n,
        }];
    }

    // Axis of greatest spread over this range.
    let dim = data[ids[0] as usize].len();
    let mut best_axis = 0;
    let mut best_spread = 0.0f32;
    for axis in 0..dim {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for &id in ids.iter() {
            let v = data[id as usize][axis];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let spread = hi - lo;
        if spread > best_spread {
            best_spread = spread;
            best_axis = axis;
        }
    }

    // All points identical on every axis: no split can make progress.
    if best_spread <= 0.0 {
        return vec![Node::Leaf {
            start: base,
            end: base + n,
        }];
    }

    let mid = n / 2;
    ids.select_nth_unstable_by(mid, |&a, &b| {
        data[a as usize][best_axis]
            .total_cmp(&data[b as usize][best_axis])
            .then(a.cmp(&b))
    });
    let value = data[ids[mid] as usize][best_axis];

    let (left_ids, right_ids) = ids.split_at_mut(mid);
    let (left_nodes, right_nodes) = if n >= PARALLEL_BUILD_CUTOFF {
        rayon::join(
            || build_range(data, left_ids, base, leaf_size),
            || build_range(data, right_ids, base + mid, leaf_size),
        )
    } else {
        (
            build_range(data, left_ids, base, leaf_size),
            build_range(data, right_ids, base + mid, leaf_size),
        )
    };

    let mut nodes = left_nodes;
    let offset = nodes.len();
    nodes.extend(right_nodes.into_iter().map(|node| match node {
        Node::Split {
            axis,
            value,
            left,
            right,
        } => Node::Split {
            axis,
            value,
            left: left + offset,
            right: right + offset,
        },
        leaf @ Node::Leaf { .. } => leaf,
    }));

    let left_root = offset - 1;
    let right_root = nodes.len() - 1;
    nodes.push(Node::Split {
        axis: best_axis,
        value,
        left: left_root,
        right: right_root,
    });
    nodes
}

impl VectorIndex for KdTreeIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::KdTree
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn build(&mut self, dataset: Dataset) -> Result<()> {
        if dataset.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: dataset.dim(),
            });
        }
        if dataset.len() > u32::MAX as usize {
            return Err(Error::Index(format!(
                "kd-tree supports at most {} vectors, got {}",
                u32::MAX,
                dataset.len()
            )));
        }

        self.vectors = dataset.into_vectors();
        self.ids = (0..self.vectors.len() as u32).collect();
        self.nodes.clear();
        self.root = None;

        if !self.vectors.is_empty() {
            self.nodes = build_range(&self.vectors, &mut self.ids, 0, self.params.leaf_size);
            self.root = Some(self.nodes.len() - 1);
        }

        tracing::info!(
            count = self.vectors.len(),
            nodes = self.nodes.len(),
            dim = self.dim,
            "built kd-tree index"
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        validate_search(self.dim, query, k)?;
        let Some(root) = self.root else {
            return Ok(Vec::new());
        };
        let mut top = TopK::new(k);
        self.knn(root, query, &mut top);
        Ok(top.into_neighbors(self.metric))
    }

    fn save(&self, path: &Path) -> Result<()> {
        crate::persistence::save_kdtree(self, path)
    }
}
