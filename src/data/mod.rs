//! Dataset types and loading
//!
//! The core works on any sample container implementing [`Samples`]:
//! - `Array3<f64>`: per-trial tensors `(n_trials, n_channels, n_times)`
//! - `Array2<f64>`: feature matrices `(n_samples, n_features)`
//!
//! Inputs are never mutated; every fold works on row subsets produced by
//! [`Samples::select`].

mod loader;

pub use loader::{load_dataset, DataFormat, LoadedDataset};

use ndarray::{Array2, Array3, Axis};

use crate::error::{Error, Result};

/// A container of samples indexed along its first axis.
pub trait Samples: Clone + Send + Sync {
    /// Number of samples (length of the first axis)
    fn n_samples(&self) -> usize;

    /// Copy of the samples at `indices`, in that order
    #[must_use]
    fn select(&self, indices: &[usize]) -> Self;

    /// Full shape, for diagnostics
    fn dims(&self) -> Vec<usize>;
}

impl Samples for Array2<f64> {
    fn n_samples(&self) -> usize {
        self.nrows()
    }

    fn select(&self, indices: &[usize]) -> Self {
        ndarray::ArrayBase::select(self, Axis(0), indices)
    }

    fn dims(&self) -> Vec<usize> {
        self.shape().to_vec()
    }
}

impl Samples for Array3<f64> {
    fn n_samples(&self) -> usize {
        self.len_of(Axis(0))
    }

    fn select(&self, indices: &[usize]) -> Self {
        ndarray::ArrayBase::select(self, Axis(0), indices)
    }

    fn dims(&self) -> Vec<usize> {
        self.shape().to_vec()
    }
}

/// Feature matrix X paired with its label vector y.
#[derive(Debug, Clone)]
pub struct Dataset<X> {
    x: X,
    y: Vec<usize>,
}

impl<X: Samples> Dataset<X> {
    /// Pair `x` with `y`, rejecting length mismatches.
    pub fn new(x: X, y: Vec<usize>) -> Result<Self> {
        if x.n_samples() != y.len() {
            return Err(Error::ShapeMismatch(format!(
                "X has {} samples (shape {:?}) but y has {} labels",
                x.n_samples(),
                x.dims(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(Error::InvalidInput("dataset has no samples".into()));
        }
        Ok(Self { x, y })
    }

    /// Feature matrix
    pub fn x(&self) -> &X {
        &self.x
    }

    /// Label vector
    pub fn y(&self) -> &[usize] {
        &self.y
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.y.len()
    }

    /// Always false for a constructed dataset
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Subset of samples and labels at `indices`
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: self.x.select(indices),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_rejects_length_mismatch() {
        let x = Array2::<f64>::zeros((4, 2));
        let err = Dataset::new(x, vec![0, 1, 0]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
        assert!(err.to_string().contains("4 samples"));
    }

    #[test]
    fn test_dataset_rejects_empty() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            Dataset::new(x, vec![]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_subset_keeps_rows_and_labels_aligned() {
        let x = Array2::from_shape_fn((5, 2), |(i, j)| (i * 10 + j) as f64);
        let ds = Dataset::new(x, vec![0, 1, 0, 1, 1]).unwrap();
        let sub = ds.subset(&[4, 1]);
        assert_eq!(sub.y(), &[1, 1]);
        assert_eq!(sub.x()[[0, 0]], 40.0);
        assert_eq!(sub.x()[[1, 1]], 11.0);
    }

    #[test]
    fn test_select_trials() {
        let x = Array3::from_shape_fn((3, 2, 4), |(i, _, _)| i as f64);
        let picked = Samples::select(&x, &[2, 0]);
        assert_eq!(picked.dims(), vec![2, 2, 4]);
        assert_eq!(picked[[0, 1, 3]], 2.0);
        assert_eq!(picked[[1, 0, 0]], 0.0);
    }
}
