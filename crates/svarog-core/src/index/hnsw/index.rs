//! Public HNSW index handle.

use super::graph::HnswGraph;
use super::params::HnswParams;
use super::reorder::LayoutMapping;
use crate::dataset::Dataset;
use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::{validate_search, IndexKind, Neighbor, VectorIndex};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Approximate nearest neighbor index over a hierarchical navigable
/// small-world graph.
///
/// # ID spaces
///
/// Before [`HnswIndex::reorder_layout`], search results carry original
/// dataset ids. After it, they carry internal (BFS-order) ids; the mapping
/// file written by the reorder pass translates internal → original, and
/// [`crate::recall::compute_recall_with_mapping`] applies that translation
/// when scoring against ground truth. Search itself never translates.
#[derive(Debug)]
pub struct HnswIndex {
    graph: HnswGraph,
    metric: DistanceMetric,
    params: HnswParams,
    /// Default beam width; read once per query, so updates are never torn.
    ef_default: AtomicUsize,
    /// Internal → original ids, present once the layout has been reordered.
    mapping: Option<Vec<u64>>,
}

impl HnswIndex {
    /// Creates an empty HNSW index.
    ///
    /// # Errors
    ///
    /// Fails if `dim` is zero or the parameters are invalid.
    pub fn new(dim: usize, metric: DistanceMetric, params: HnswParams) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_parameter("dim", "must be at least 1"));
        }
        params.validate()?;
        Ok(Self {
            graph: HnswGraph::new(
                dim,
                params.m,
                params.ef_construction,
                params.seed,
                params.max_visited,
            ),
            metric,
            params,
            ef_default: AtomicUsize::new(params.ef_search),
            mapping: None,
        })
    }

    /// The metric this index reports distances in.
    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Construction parameters.
    #[must_use]
    pub fn params(&self) -> HnswParams {
        self.params
    }

    /// Current default search beam width.
    #[must_use]
    pub fn ef_search(&self) -> usize {
        self.ef_default.load(Ordering::Relaxed)
    }

    /// Sets the default search beam width for subsequent queries.
    ///
    /// Takes `&self`: the value is an atomic read once at query entry, so
    /// concurrent searches never observe a torn update and no rebuild is
    /// needed.
    ///
    /// # Errors
    ///
    /// Fails if `ef` is zero.
    pub fn set_ef_search(&self, ef: usize) -> Result<()> {
        if ef == 0 {
            return Err(Error::invalid_parameter("ef", "must be at least 1"));
        }
        self.ef_default.store(ef, Ordering::Relaxed);
        Ok(())
    }

    /// Searches with an explicit beam width, overriding the default.
    ///
    /// # Errors
    ///
    /// Fails if `k` or `ef` is zero, or the query dimension mismatches.
    pub fn search_with_ef(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<Neighbor>> {
        validate_search(self.graph.dim(), query, k)?;
        if ef == 0 {
            return Err(Error::invalid_parameter("ef", "must be at least 1"));
        }

        let found = self.graph.search(query, k, ef);

        // Shortfall means the beam could not reach enough nodes (grossly
        // disconnected graph or a visit cap): degraded, not silently wrong.
        let expected = k.min(self.graph.len());
        if found.len() < expected {
            tracing::warn!(
                found = found.len(),
                expected,
                k,
                ef,
                "degraded search result: beam reached fewer nodes than requested"
            );
        }

        Ok(found
            .into_iter()
            .map(|(id, dist)| Neighbor {
                id: id as u64,
                distance: self.metric.finalize(dist),
            })
            .collect())
    }

    /// Batched variant of [`HnswIndex::search_with_ef`].
    ///
    /// # Errors
    ///
    /// Same conditions as the single-query variant.
    pub fn search_batch_with_ef(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        ef: usize,
    ) -> Result<Vec<Vec<Neighbor>>> {
        use rayon::prelude::*;
        queries
            .par_iter()
            .map(|q| self.search_with_ef(q, k, ef))
            .collect()
    }

    /// Reorders the graph layout in BFS order and writes the id mapping.
    ///
    /// Improves cache-line utilization during beam search; result sets are
    /// unchanged, only the id space shifts to internal ids (see the type-level
    /// docs). Reordering twice composes: the mapping always translates all
    /// the way back to original dataset ids.
    ///
    /// # Errors
    ///
    /// Fails if the mapping file cannot be written.
    pub fn reorder_layout(&mut self, mapping_path: &Path) -> Result<()> {
        let order = self.graph.reorder_bfs();
        let entries: Vec<u64> = match &self.mapping {
            Some(prev) => order.iter().map(|&p| prev[p]).collect(),
            None => order.iter().map(|&p| p as u64).collect(),
        };
        LayoutMapping::from_entries(entries.clone()).write(mapping_path)?;
        self.mapping = Some(entries);

        tracing::info!(
            count = self.graph.len(),
            mapping = %mapping_path.display(),
            "reordered hnsw layout in BFS order"
        );
        Ok(())
    }

    /// The in-memory internal→original mapping, if the layout has been
    /// reordered.
    #[must_use]
    pub fn layout_mapping(&self) -> Option<&[u64]> {
        self.mapping.as_deref()
    }

    pub(crate) fn graph(&self) -> &HnswGraph {
        &self.graph
    }

    pub(crate) fn from_parts(
        graph: HnswGraph,
        metric: DistanceMetric,
        params: HnswParams,
        ef_search: usize,
        mapping: Option<Vec<u64>>,
    ) -> Self {
        Self {
            graph,
            metric,
            params,
            ef_default: AtomicUsize::new(ef_search),
            mapping,
        }
    }

    pub(crate) fn mapping_entries(&self) -> Option<&Vec<u64>> {
        self.mapping.as_ref()
    }
}

impl VectorIndex for HnswIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Hnsw
    }

    fn dimension(&self) -> usize {
        self.graph.dim()
    }

    fn len(&self) -> usize {
        self.graph.len()
    }

    fn build(&mut self, dataset: Dataset) -> Result<()> {
        if dataset.dim() != self.graph.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.graph.dim(),
                actual: dataset.dim(),
            });
        }

        // Insertion order is part of the build contract: original ids are
        // assigned in dataset order, deterministically.
        for vector in dataset.into_vectors() {
            self.graph.insert(vector);
        }

        tracing::info!(
            count = self.graph.len(),
            m = self.params.m,
            ef_construction = self.params.ef_construction,
            "built hnsw index"
        );
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.search_with_ef(query, k, self.ef_search())
    }

    fn save(&self, path: &Path) -> Result<()> {
        crate::persistence::save_hnsw(self, path)
    }
}
