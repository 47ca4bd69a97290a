//! Distance metrics for vector similarity.
//!
//! The engine ranks candidates by squared L2 distance everywhere (KDTree
//! pruning and k-means centroids are only valid for the L2 family), and the
//! metric decides how the winning distances are reported: as-is for
//! [`DistanceMetric::SquaredEuclidean`], with a final square root for
//! [`DistanceMetric::Euclidean`]. The sqrt happens once per reported result,
//! never on the hot path.

use crate::simd;
use serde::{Deserialize, Serialize};

/// Distance metric for vector similarity calculations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance (default). Same ranking as Euclidean,
    /// no square root per comparison.
    #[default]
    SquaredEuclidean,

    /// Euclidean distance (L2 norm).
    Euclidean,
}

impl DistanceMetric {
    /// Calculates the distance between two vectors under this metric.
    ///
    /// # Panics
    ///
    /// Panics if the vectors have different dimensions.
    #[inline]
    #[must_use]
    pub fn calculate(&self, a: &[f32], b: &[f32]) -> f32 {
        self.finalize(simd::squared_l2(a, b))
    }

    /// Internal ranking distance (always squared L2).
    #[inline]
    pub(crate) fn ranking(a: &[f32], b: &[f32]) -> f32 {
        simd::squared_l2(a, b)
    }

    /// Converts an internal ranking distance into a reportable one.
    #[inline]
    pub(crate) fn finalize(self, ranking_distance: f32) -> f32 {
        match self {
            Self::SquaredEuclidean => ranking_distance,
            Self::Euclidean => ranking_distance.sqrt(),
        }
    }
}
