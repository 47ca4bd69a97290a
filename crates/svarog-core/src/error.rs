//! Error types for Svarog.
//!
//! One unified error type for all engine operations. Each variant carries a
//! stable `SVG-XXX` code so callers (benchmark harnesses, bindings) can match
//! on failures without parsing messages.

use thiserror::Error;

/// Result type alias for Svarog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Svarog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Vector dimension mismatch (SVG-001).
    #[error("[SVG-001] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was constructed with.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Invalid parameter value (SVG-002).
    ///
    /// Parameters are never clamped silently; a misconfigured `k`, `ef` or
    /// `nprobe` fails here instead of skewing benchmark numbers.
    #[error("[SVG-002] Invalid parameter '{param}': {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        param: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// Malformed dataset or artifact file (SVG-003).
    #[error("[SVG-003] Format error in '{path}': {message}")]
    Format {
        /// Path of the offending file.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// Persisted index failed validation (SVG-004).
    #[error("[SVG-004] Index corrupted: {0}")]
    IndexCorrupted(String),

    /// IO error (SVG-005).
    #[error("[SVG-005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (SVG-006).
    #[error("[SVG-006] Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (SVG-007).
    #[error("[SVG-007] Configuration error: {0}")]
    Config(String),

    /// Layout mapping inconsistency (SVG-008).
    ///
    /// Raised when recall scoring is asked to translate ids through a mapping
    /// that is missing, truncated, or belongs to a different index.
    #[error("[SVG-008] Layout mapping error: {0}")]
    Mapping(String),

    /// Index-level error (SVG-009).
    #[error("[SVG-009] Index error: {0}")]
    Index(String),
}

impl Error {
    /// Returns the stable error code (e.g. "SVG-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "SVG-001",
            Self::InvalidParameter { .. } => "SVG-002",
            Self::Format { .. } => "SVG-003",
            Self::IndexCorrupted(_) => "SVG-004",
            Self::Io(_) => "SVG-005",
            Self::Serialization(_) => "SVG-006",
            Self::Config(_) => "SVG-007",
            Self::Mapping(_) => "SVG-008",
            Self::Index(_) => "SVG-009",
        }
    }

    pub(crate) fn invalid_parameter(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            message: message.into(),
        }
    }
}
