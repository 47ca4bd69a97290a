//! Engine configuration.
//!
//! Layered via figment: defaults, then an optional `svarog.toml`, then
//! `SVAROG_*` environment variables (highest priority). Sections map
//! directly onto the per-variant parameter structs, so a harness can go
//! from a config file to index construction without hand-copying fields.

use crate::error::{Error, Result};
use crate::index::hnsw::HnswParams;
use crate::index::ivf::IvfParams;
use crate::index::kdtree::KdTreeParams;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Search quality presets, each a default `ef_search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// `ef_search = 32`; lowest latency.
    Fast,
    /// `ef_search = 64` (default).
    #[default]
    Balanced,
    /// `ef_search = 256`; highest recall.
    Accurate,
}

impl SearchMode {
    /// The `ef_search` value this preset stands for.
    #[must_use]
    pub const fn ef_search(self) -> usize {
        match self {
            Self::Fast => 32,
            Self::Balanced => 64,
            Self::Accurate => 256,
        }
    }
}

/// Search section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Preset used when `ef_search` is not given explicitly.
    pub mode: SearchMode,
    /// Explicit `ef_search`; overrides the preset when set.
    pub ef_search: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Balanced,
            ef_search: None,
        }
    }
}

impl SearchConfig {
    /// The effective `ef_search` after applying the override.
    #[must_use]
    pub fn effective_ef_search(&self) -> usize {
        self.ef_search.unwrap_or_else(|| self.mode.ef_search())
    }
}

/// HNSW section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswConfig {
    /// Links per node above layer 0.
    pub m: usize,
    /// Construction beam width.
    pub ef_construction: usize,
    /// Layer-draw seed.
    pub seed: u64,
    /// Optional beam-search visit cap.
    pub max_visited: Option<usize>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let p = HnswParams::default();
        Self {
            m: p.m,
            ef_construction: p.ef_construction,
            seed: p.seed,
            max_visited: p.max_visited,
        }
    }
}

/// IVF section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IvfConfig {
    /// Cluster count.
    pub nlist: usize,
    /// Default clusters probed per query.
    pub nprobe: usize,
    /// k-means iteration bound.
    pub max_iterations: usize,
    /// Centroid-seeding seed.
    pub seed: u64,
}

impl Default for IvfConfig {
    fn default() -> Self {
        let p = IvfParams::default();
        Self {
            nlist: p.nlist,
            nprobe: p.nprobe,
            max_iterations: p.max_iterations,
            seed: p.seed,
        }
    }
}

/// KDTree section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdTreeConfig {
    /// Leaf-size cutoff.
    pub leaf_size: usize,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self {
            leaf_size: KdTreeParams::default().leaf_size,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Search-time settings.
    pub search: SearchConfig,
    /// HNSW construction settings.
    pub hnsw: HnswConfig,
    /// IVF construction settings.
    pub ivf: IvfConfig,
    /// KDTree construction settings.
    pub kdtree: KdTreeConfig,
}

impl EngineConfig {
    /// Loads configuration: defaults, then `path` (if it exists), then
    /// `SVAROG_*` environment variables.
    ///
    /// Nested keys use `__` in the environment, e.g.
    /// `SVAROG_HNSW__EF_CONSTRUCTION=400`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on parse failure or invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SVAROG_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "resolved engine configuration");
        Ok(config)
    }

    /// Validates cross-field constraints without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] on the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.hnsw_params().validate()?;
        self.ivf_params().validate()?;
        KdTreeParams {
            leaf_size: self.kdtree.leaf_size,
        }
        .validate()?;
        if self.search.ef_search == Some(0) {
            return Err(Error::invalid_parameter(
                "search.ef_search",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }

    /// HNSW parameters implied by this configuration.
    #[must_use]
    pub fn hnsw_params(&self) -> HnswParams {
        HnswParams {
            m: self.hnsw.m,
            ef_construction: self.hnsw.ef_construction,
            ef_search: self.search.effective_ef_search(),
            seed: self.hnsw.seed,
            max_visited: self.hnsw.max_visited,
        }
    }

    /// IVF parameters implied by this configuration.
    #[must_use]
    pub fn ivf_params(&self) -> IvfParams {
        IvfParams {
            nlist: self.ivf.nlist,
            nprobe: self.ivf.nprobe,
            max_iterations: self.ivf.max_iterations,
            seed: self.ivf.seed,
        }
    }

    /// KDTree parameters implied by this configuration.
    #[must_use]
    pub fn kdtree_params(&self) -> KdTreeParams {
        KdTreeParams {
            leaf_size: self.kdtree.leaf_size,
        }
    }
}
