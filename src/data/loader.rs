//! Dataset file loading
//!
//! The format follows the file extension:
//! - `.npy`: NumPy arrays. X is `float64` (or `float32`), y holds integer
//!   labels (`int64`, `int32` or integral `float64`).
//! - anything else: JSON. X is a serialized `ndarray` array
//!   (`{"v":1,"dim":[...],"data":[...]}`), y a JSON array of labels.

use std::fs::{self, File};
use std::path::Path;

use ndarray::{Array1, ArrayD, Ix2, Ix3};
use ndarray_npy::{ReadNpyError, ReadNpyExt};

use super::Dataset;
use crate::error::{Error, Result};

/// On-disk array format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// NumPy `.npy`
    Npy,
    /// `ndarray` serde JSON
    Json,
}

impl DataFormat {
    /// Format implied by the extension of `path`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("npy") => Self::Npy,
            _ => Self::Json,
        }
    }
}

/// A loaded dataset, dispatched on the rank of X.
#[derive(Debug, Clone)]
pub enum LoadedDataset {
    /// `(n_trials, n_channels, n_times)` multichannel trials
    Trials(Dataset<ndarray::Array3<f64>>),
    /// `(n_samples, n_features)` feature vectors
    Features(Dataset<ndarray::Array2<f64>>),
}

impl LoadedDataset {
    /// Number of samples
    pub fn len(&self) -> usize {
        match self {
            Self::Trials(ds) => ds.len(),
            Self::Features(ds) => ds.len(),
        }
    }

    /// Always false for a loaded dataset
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label vector
    pub fn labels(&self) -> &[usize] {
        match self {
            Self::Trials(ds) => ds.y(),
            Self::Features(ds) => ds.y(),
        }
    }
}

/// Load X and y, each in the format implied by its extension.
pub fn load_dataset(x_path: &Path, y_path: &Path) -> Result<LoadedDataset> {
    let x = match DataFormat::from_path(x_path) {
        DataFormat::Npy => read_npy_features(x_path)?,
        DataFormat::Json => read_json_features(x_path)?,
    };
    let y = match DataFormat::from_path(y_path) {
        DataFormat::Npy => read_npy_labels(y_path)?,
        DataFormat::Json => read_json_labels(y_path)?,
    };

    match x.ndim() {
        3 => {
            let x = x
                .into_dimensionality::<Ix3>()
                .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
            Ok(LoadedDataset::Trials(Dataset::new(x, y)?))
        }
        2 => {
            let x = x
                .into_dimensionality::<Ix2>()
                .map_err(|e| Error::ShapeMismatch(e.to_string()))?;
            Ok(LoadedDataset::Features(Dataset::new(x, y)?))
        }
        rank => Err(Error::ShapeMismatch(format!(
            "X must have rank 2 (samples × features) or 3 (trials × channels × times), got rank {rank}"
        ))),
    }
}

fn read_json_features(path: &Path) -> Result<ArrayD<f64>> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading feature matrix {}", path.display()), e))?;
    serde_json::from_str(&json).map_err(|e| {
        Error::Serialization(format!("{} is not an ndarray JSON document: {e}", path.display()))
    })
}

fn read_json_labels(path: &Path) -> Result<Vec<usize>> {
    let json = fs::read_to_string(path)
        .map_err(|e| Error::io(format!("reading labels {}", path.display()), e))?;
    serde_json::from_str(&json).map_err(|e| {
        Error::Serialization(format!(
            "{} is not a JSON array of non-negative integers: {e}",
            path.display()
        ))
    })
}

fn open_npy<T: ReadNpyExt>(path: &Path, what: &str) -> Result<std::result::Result<T, ReadNpyError>> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("reading {what} {}", path.display()), e))?;
    Ok(T::read_npy(file))
}

fn npy_error(path: &Path, err: &ReadNpyError) -> Error {
    Error::Serialization(format!("{} is not a readable .npy array: {err}", path.display()))
}

fn read_npy_features(path: &Path) -> Result<ArrayD<f64>> {
    match open_npy::<ArrayD<f64>>(path, "feature matrix")? {
        Ok(x) => Ok(x),
        Err(ReadNpyError::WrongDescriptor(_)) => open_npy::<ArrayD<f32>>(path, "feature matrix")?
            .map(|x| x.mapv(f64::from))
            .map_err(|e| npy_error(path, &e)),
        Err(e) => Err(npy_error(path, &e)),
    }
}

fn read_npy_labels(path: &Path) -> Result<Vec<usize>> {
    let raw: Vec<f64> = match open_npy::<Array1<i64>>(path, "labels")? {
        Ok(y) => return labels_from_ints(path, y.iter().copied()),
        Err(ReadNpyError::WrongDescriptor(_)) => match open_npy::<Array1<i32>>(path, "labels")? {
            Ok(y) => return labels_from_ints(path, y.iter().map(|&v| i64::from(v))),
            Err(ReadNpyError::WrongDescriptor(_)) => open_npy::<Array1<f64>>(path, "labels")?
                .map_err(|e| npy_error(path, &e))?
                .to_vec(),
            Err(e) => return Err(npy_error(path, &e)),
        },
        Err(e) => return Err(npy_error(path, &e)),
    };

    raw.into_iter()
        .map(|v| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(Error::InvalidInput(format!(
                    "{} holds label {v}; labels must be non-negative integers",
                    path.display()
                )))
            }
        })
        .collect()
}

fn labels_from_ints(path: &Path, values: impl Iterator<Item = i64>) -> Result<Vec<usize>> {
    values
        .map(|v| {
            usize::try_from(v).map_err(|_| {
                Error::InvalidInput(format!(
                    "{} holds label {v}; labels must be non-negative integers",
                    path.display()
                ))
            })
        })
        .collect()
}
