//! Dimension-checked vector dataset.
//!
//! A [`Dataset`] owns an ordered sequence of fixed-dimension vectors. Every
//! vector gets a stable 0-based original id equal to its insertion position;
//! those ids are what search results and ground-truth files refer to.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// An ordered, dimension-checked collection of vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl Dataset {
    /// Creates an empty dataset of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `dim` is zero.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::invalid_parameter("dim", "must be at least 1"));
        }
        Ok(Self {
            dim,
            vectors: Vec::new(),
        })
    }

    /// Creates a dataset from existing vectors, validating every dimension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `dim` is zero, or
    /// [`Error::DimensionMismatch`] on the first vector of the wrong length.
    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let mut dataset = Self::new(dim)?;
        for v in &vectors {
            if v.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }
        dataset.vectors = vectors;
        Ok(dataset)
    }

    /// Appends a vector and returns its original id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the vector has the wrong length.
    pub fn push(&mut self, vector: Vec<f32>) -> Result<u64> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        let id = self.vectors.len() as u64;
        self.vectors.push(vector);
        Ok(id)
    }

    /// Vector dimension.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns true if the dataset holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Returns the vector with the given original id, if present.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    /// All vectors in original-id order.
    #[must_use]
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Consumes the dataset, yielding the raw vectors in original-id order.
    #[must_use]
    pub fn into_vectors(self) -> Vec<Vec<f32>> {
        self.vectors
    }
}
