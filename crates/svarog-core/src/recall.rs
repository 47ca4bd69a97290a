//! Recall@K scoring, with and without a layout mapping.
//!
//! Ground truth and predictions come in as flattened row-major id arrays of
//! shape `num_queries × k`, the layout the benchmark harnesses produce.
//! [`compute_recall_with_mapping`] is the post-reorder variant: predicted
//! ids are internal (BFS-order) ids and must be translated back to original
//! dataset ids through the mapping file before they can be compared against
//! ground truth. Calling it with a mapping that does not belong to the index
//! fails instead of producing a meaningless score.

use crate::error::{Error, Result};
use crate::index::hnsw::LayoutMapping;
use rustc_hash::FxHashSet;
use std::path::Path;

fn validate_shapes(groundtruth: &[u64], predicted: &[u64], num_queries: usize, k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::invalid_parameter("k", "must be at least 1"));
    }
    if num_queries == 0 {
        return Err(Error::invalid_parameter("num_queries", "must be at least 1"));
    }
    let expected = num_queries * k;
    if groundtruth.len() != expected {
        return Err(Error::invalid_parameter(
            "groundtruth",
            format!(
                "expected {expected} ids ({num_queries} queries x {k}), got {}",
                groundtruth.len()
            ),
        ));
    }
    if predicted.len() != expected {
        return Err(Error::invalid_parameter(
            "predicted",
            format!(
                "expected {expected} ids ({num_queries} queries x {k}), got {}",
                predicted.len()
            ),
        ));
    }
    Ok(())
}

/// Computes mean recall@K over flattened ground-truth and predicted id rows.
///
/// Both arrays must hold exactly `num_queries * k` ids in the same id space.
///
/// # Errors
///
/// Fails if `k` or `num_queries` is zero, or either array has the wrong
/// length.
#[allow(clippy::cast_precision_loss)]
pub fn recall_at_k(
    groundtruth: &[u64],
    predicted: &[u64],
    num_queries: usize,
    k: usize,
) -> Result<f64> {
    validate_shapes(groundtruth, predicted, num_queries, k)?;

    let mut total = 0.0f64;
    for q in 0..num_queries {
        let row = q * k;
        let truth: FxHashSet<u64> = groundtruth[row..row + k].iter().copied().collect();
        let hits = predicted[row..row + k]
            .iter()
            .filter(|id| truth.contains(id))
            .count();
        total += hits as f64 / truth.len() as f64;
    }
    Ok(total / num_queries as f64)
}

/// Computes mean recall@K after translating predicted internal ids back to
/// original dataset ids through the layout mapping at `mapping_path`.
///
/// This is the scoring path to use after `HnswIndex::reorder_layout`:
/// ground truth stays in original-id space, predictions are internal.
///
/// # Errors
///
/// Fails on shape errors as [`recall_at_k`] does, if the mapping file is
/// missing or malformed, or if any predicted id falls outside the mapping
/// (which means the mapping belongs to a different index).
pub fn compute_recall_with_mapping(
    groundtruth: &[u64],
    predicted: &[u64],
    num_queries: usize,
    k: usize,
    mapping_path: &Path,
) -> Result<f64> {
    validate_shapes(groundtruth, predicted, num_queries, k)?;

    let mapping = LayoutMapping::read(mapping_path)?;
    let translated: Vec<u64> = predicted
        .iter()
        .map(|&internal| mapping.translate(internal))
        .collect::<Result<_>>()?;

    recall_at_k(groundtruth, &translated, num_queries, k)
}
