//! HNSW index parameters.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// HNSW construction and search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Bi-directional links per node above layer 0 (`M`). Layer 0 allows `2M`.
    pub m: usize,
    /// Beam width while inserting. Higher = better recall, slower build.
    pub ef_construction: usize,
    /// Initial search-time beam width; mutable later via `set_ef_search`.
    pub ef_search: usize,
    /// Seed for the layer-selection draw. Same seed + same insertion order
    /// reproduces the same graph bit for bit.
    pub seed: u64,
    /// Hard cap on nodes visited per beam search. When hit, the beam returns
    /// whatever it has found so far (a partial, possibly degraded result)
    /// instead of running unbounded on a pathological graph.
    pub max_visited: Option<usize>,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 64,
            seed: 0xC0FF_EE11,
            max_visited: None,
        }
    }
}

impl HnswParams {
    /// Parameters favoring build throughput over recall.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            m: 12,
            ef_construction: 100,
            ..Self::default()
        }
    }

    /// Parameters favoring recall over build throughput.
    #[must_use]
    pub fn high_recall() -> Self {
        Self {
            m: 32,
            ef_construction: 400,
            ef_search: 256,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.m < 2 {
            return Err(Error::invalid_parameter("m", "must be at least 2"));
        }
        if self.ef_construction == 0 {
            return Err(Error::invalid_parameter(
                "ef_construction",
                "must be at least 1",
            ));
        }
        if self.ef_search == 0 {
            return Err(Error::invalid_parameter("ef_search", "must be at least 1"));
        }
        if self.max_visited == Some(0) {
            return Err(Error::invalid_parameter(
                "max_visited",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}
