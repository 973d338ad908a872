//! Tensor - row-major `f32` data container passed between pipeline steps
//!
//! The first axis is always the sample axis: validation techniques split
//! tensors by selecting rows along it.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// N-dimensional row-major `f32` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a tensor from a shape and flat row-major data.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the shape is empty or its product differs
    /// from `data.len()`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(Error::ShapeMismatch {
                expected: format!("{expected} elements for shape {shape:?}"),
                actual: format!("{} elements", data.len()),
            });
        }
        Ok(Self { shape, data })
    }

    /// Shape as a slice.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat row-major data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of dimensions.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of samples (length of the first axis).
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.shape[0]
    }

    /// Elements per sample.
    #[must_use]
    pub fn row_len(&self) -> usize {
        self.shape[1..].iter().product()
    }

    /// Borrow one sample as a flat slice.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        let width = self.row_len();
        &self.data[index * width..(index + 1) * width]
    }

    /// Gather samples by index, in the given order.
    ///
    /// # Errors
    /// Returns `InvalidInput` if any index is out of bounds.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let n = self.n_samples();
        let width = self.row_len();
        let mut data = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            if i >= n {
                return Err(Error::InvalidInput(format!(
                    "row index {i} out of bounds for {n} samples"
                )));
            }
            data.extend_from_slice(self.row(i));
        }
        let mut shape = self.shape.clone();
        shape[0] = indices.len();
        Ok(Self { shape, data })
    }

    /// Reshape, allowing one `-1` dimension to be inferred.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the element count is incompatible or more
    /// than one dimension is `-1`.
    pub fn reshape(&self, shape: &[isize]) -> Result<Self> {
        let mismatch = || Error::ShapeMismatch {
            expected: format!("shape compatible with {shape:?}"),
            actual: format!("{:?}", self.shape),
        };
        let inferred: Vec<usize> = shape
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == -1)
            .map(|(i, _)| i)
            .collect();
        if inferred.len() > 1 || shape.iter().any(|&d| d < -1) {
            return Err(mismatch());
        }

        let known: usize = shape
            .iter()
            .filter(|&&d| d != -1)
            .map(|&d| d.unsigned_abs())
            .product();
        let mut resolved: Vec<usize> = shape.iter().map(|&d| d.unsigned_abs()).collect();
        if let Some(&axis) = inferred.first() {
            if known == 0 || self.len() % known != 0 {
                return Err(mismatch());
            }
            resolved[axis] = self.len() / known;
        }
        Self::new(resolved, self.data.clone()).map_err(|_| mismatch())
    }

    /// Apply a function to every element.
    #[must_use]
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }
}

impl From<Vec<f32>> for Tensor {
    fn from(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }
}

impl From<&[f32]> for Tensor {
    fn from(data: &[f32]) -> Self {
        Self::from(data.to_vec())
    }
}
