//! Inverted-file index with flat vectors (IVFFlat).
//!
//! Build runs a bounded k-means over the dataset to produce `nlist`
//! centroids, then assigns every vector to its nearest centroid, forming
//! per-cluster inverted lists. Search scores the query against all
//! centroids, probes the `nprobe` nearest clusters exhaustively, and merges
//! candidates into a top-k heap. `nprobe` trades recall for latency:
//! probing more clusters only ever adds candidates, so recall is
//! non-decreasing in `nprobe`.

use super::{validate_search, IndexKind, Neighbor, TopK, VectorIndex};
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::rng::XorShift64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Centroid movement (squared) below which k-means is considered converged.
const MOVEMENT_EPS: f32 = 1e-4;

/// IVFFlat construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvfParams {
    /// Number of k-means clusters.
    pub nlist: usize,
    /// Default number of clusters probed per query (overridable per call).
    pub nprobe: usize,
    /// Upper bound on k-means iterations.
    pub max_iterations: usize,
    /// Seed for centroid initialization.
    pub seed: u64,
}

impl Default for IvfParams {
    fn default() -> Self {
        Self {
            nlist: 100,
            nprobe: 8,
            max_iterations: 25,
            seed: 0x51F0_D1A4,
        }
    }
}

impl IvfParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.nlist == 0 {
            return Err(Error::invalid_parameter("nlist", "must be at least 1"));
        }
        if self.nprobe == 0 {
            return Err(Error::invalid_parameter("nprobe", "must be at least 1"));
        }
        if self.nprobe > self.nlist {
            return Err(Error::invalid_parameter(
                "nprobe",
                format!("must not exceed nlist ({})", self.nlist),
            ));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid_parameter(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Inverted-file index over a k-means coarse quantizer.
#[derive(Debug)]
pub struct IvfFlatIndex {
    dim: usize,
    metric: DistanceMetric,
    params: IvfParams,
    nprobe_default: AtomicUsize,
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) centroids: Vec<Vec<f32>>,
    pub(crate) lists: Vec<Vec<u32>>,
}

impl IvfFlatIndex {
    /// Creates an empty IVFFlat index.
    ///
    /// # Errors
    ///
    /// Fails if `dim` is zero or the parameters are invalid.
    pub fn new(dim: usize, metric: DistanceMetric, params: IvfParams) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_parameter("dim", "must be at least 1"));
        }
        params.validate()?;
        Ok(Self {
            dim,
            metric,
            params,
            nprobe_default: AtomicUsize::new(params.nprobe),
            vectors: Vec::new(),
            centroids: Vec::new(),
            lists: Vec::new(),
        })
    }

    /// The metric this index reports distances in.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Construction parameters.
    #[must_use]
    pub fn params(&self) -> IvfParams {
        self.params
    }

    /// Current default `nprobe`.
    #[must_use]
    pub fn nprobe(&self) -> usize {
        self.nprobe_default.load(Ordering::Relaxed)
    }

    /// Sets the default `nprobe` for subsequent searches.
    ///
    /// The value is read once at the start of each query, so in-flight
    /// searches never observe a torn update.
    ///
    /// # Errors
    ///
    /// Fails if `nprobe` is zero or exceeds `nlist`.
    pub fn set_nprobe(&self, nprobe: usize) -> Result<()> {
        if nprobe == 0 {
            return Err(Error::invalid_parameter("nprobe", "must be at least 1"));
        }
        if nprobe > self.params.nlist {
            return Err(Error::invalid_parameter(
                "nprobe",
                format!("must not exceed nlist ({})", self.params.nlist),
            ));
        }
        self.nprobe_default.store(nprobe, Ordering::Relaxed);
        Ok(())
    }

    /// Searches with an explicit `nprobe`, overriding the default.
    ///
    /// # Errors
    ///
    /// Fails if `k` is zero, the query dimension mismatches, `nprobe` is
    /// zero, or `nprobe` exceeds `nlist`.
    pub fn search_with_nprobe(
        &self,
        query: &[f32],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<Neighbor>> {
        validate_search(self.dim, query, k)?;
        if nprobe == 0 {
            return Err(Error::invalid_parameter("nprobe", "must be at least 1"));
        }
        if nprobe > self.params.nlist {
            return Err(Error::invalid_parameter(
                "nprobe",
                format!("must not exceed nlist ({})", self.params.nlist),
            ));
        }
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        // Score the query against every centroid, then keep the nprobe
        // nearest clusters. Full sort keeps probed sets nested across
        // nprobe values, which is what makes recall monotone.
        let mut by_dist: Vec<(f32, usize)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| (DistanceMetric::ranking(query, centroid), c))
            .collect();
        by_dist.sort_unstable_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut top = TopK::new(k);
        for &(_, cluster) in by_dist.iter().take(nprobe) {
            for &id in &self.lists[cluster] {
                let dist = DistanceMetric::ranking(query, &self.vectors[id as usize]);
                top.push(dist, u64::from(id));
            }
        }
        Ok(top.into_neighbors(self.metric))
    }

    /// Batched variant of [`IvfFlatIndex::search_with_nprobe`].
    ///
    /// # Errors
    ///
    /// Same conditions as the single-query variant.
    pub fn search_batch_with_nprobe(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        nprobe: usize,
    ) -> Result<Vec<Vec<Neighbor>>> {
        queries
            .par_iter()
            .map(|q| self.search_with_nprobe(q, k, nprobe))
            .collect()
    }

    /// Reassembles an index from persisted parts. Caller has already
    /// validated payload consistency against the file header.
    pub(crate) fn from_parts(
        dim: usize,
        metric: DistanceMetric,
        params: IvfParams,
        nprobe: usize,
        vectors: Vec<Vec<f32>>,
        centroids: Vec<Vec<f32>>,
        lists: Vec<Vec<u32>>,
    ) -> Result<Self> {
        let mut index = Self::new(dim, metric, params)?;
        index.set_nprobe(nprobe)?;
        index.vectors = vectors;
        index.centroids = centroids;
        index.lists = lists;
        Ok(index)
    }

    fn nearest_centroid(centroids: &[Vec<f32>], v: &[f32]) -> usize {
        let mut best = 0;
        let mut best_dist = f32::MAX;
        for (c, centroid) in centroids.iter().enumerate() {
            let d = DistanceMetric::ranking(v, centroid);
            if d < best_dist {
                best_dist = d;
                best = c;
            }
        }
        best
    }

    /// Lloyd's k-means with deterministic seeding and empty-cluster recovery.
    fn kmeans(&mut self) {
        let n = self.vectors.len();
        let nlist = self.params.nlist;
        let mut rng = XorShift64::new(self.params.seed);

        // Sample nlist distinct starting points (partial Fisher-Yates).
        let mut pool: Vec<usize> = (0..n).collect();
        self.centroids = (0..nlist)
            .map(|i| {
                let j = i + rng.next_bounded(n - i);
                pool.swap(i, j);
                self.vectors[pool[i]].clone()
            })
            .collect();

        for iteration in 0..self.params.max_iterations {
            // Assignment step, parallel over points.
            let centroids = &self.centroids;
            let assignment: Vec<usize> = self
                .vectors
                .par_iter()
                .map(|v| Self::nearest_centroid(centroids, v))
                .collect();

            // Update step.
            let mut sums = vec![vec![0.0f32; self.dim]; nlist];
            let mut counts = vec![0usize; nlist];
            for (i, &c) in assignment.iter().enumerate() {
                counts[c] += 1;
                for (s, x) in sums[c].iter_mut().zip(&self.vectors[i]) {
                    *s += *x;
                }
            }

            let mut movement = 0.0f32;
            let mut reseeded = false;
            for c in 0..nlist {
                if counts[c] == 0 {
                    // Reseed from the point farthest from its own centroid;
                    // standard degeneracy fix, forces another iteration.
                    let far = (0..n)
                        .max_by(|&a, &b| {
                            let da = DistanceMetric::ranking(
                                &self.vectors[a],
                                &self.centroids[assignment[a]],
                            );
                            let db = DistanceMetric::ranking(
                                &self.vectors[b],
                                &self.centroids[assignment[b]],
                            );
                            da.total_cmp(&db).then(a.cmp(&b))
                        })
                        .unwrap_or(0);
                    self.centroids[c] = self.vectors[far].clone();
                    reseeded = true;
                    tracing::warn!(cluster = c, reseed_from = far, "reseeded empty cluster");
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let inv = 1.0 / counts[c] as f32;
                let mut updated = std::mem::take(&mut sums[c]);
                for x in &mut updated {
                    *x *= inv;
                }
                movement = movement.max(DistanceMetric::ranking(&updated, &self.centroids[c]));
                self.centroids[c] = updated;
            }

            if !reseeded && movement < MOVEMENT_EPS {
                tracing::debug!(iteration, movement, "k-means converged");
                break;
            }
        }

        // Final assignment into inverted lists.
        let centroids = &self.centroids;
        let final_assignment: Vec<usize> = self
            .vectors
            .par_iter()
            .map(|v| Self::nearest_centroid(centroids, v))
            .collect();
        self.lists = vec![Vec::new(); nlist];
        for (i, &c) in final_assignment.iter().enumerate() {
            self.lists[c].push(i as u32);
        }
    }
}

impl VectorIndex for IvfFlatIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::IvfFlat
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
        if dataset.is_empty() {
            self.vectors = Vec::new();
            self.centroids = Vec::new();
            self.lists = Vec::new();
            return Ok(());
        }
        if self.params.nlist > dataset.len() {
            return Err(Error::invalid_parameter(
                "nlist",
                format!(
                    "must not exceed dataset size ({} > {})",
                    self.params.nlist,
                    dataset.len()
                ),
            ));
        }
        if dataset.len() > u32::MAX as usize {
            return Err(Error::Index(format!(
                "ivf index supports at most {} vectors, got {}",
                u32::MAX,
                dataset.len()
            )));
        }

        self.vectors = dataset.into_vectors();
        self.kmeans();

        tracing::info!(
            count = self.vectors.len(),
            nlist = self.params.nlist,
            dim = self.dim,
            "built ivf-flat index"
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.search_with_nprobe(query, k, self.nprobe())
    }

    fn save(&self, path: &Path) -> Result<()> {
        crate::persistence::save_ivf(self, path)
    }
}
