//! Two-stage classification pipelines
//!
//! A [`Pipeline`] is a feature extractor ([`Transformer`]) followed by a
//! classifier ([`Predictor`]). The extractor consumes the raw sample container
//! `X` (trials or feature rows) and always emits a [`Features`] matrix, which
//! is the only input a classifier accepts, so an incompatible composition
//! does not type-check.
//!
//! Stages are created by name through a [`StageRegistry`]; a
//! [`PipelineTemplate`] binds an extractor and classifier spec and builds a
//! fresh, unfit pipeline for every fold and hyperparameter combination.

pub mod csp;
pub mod lda;
pub mod params;
pub mod registry;
pub mod scaler;

#[cfg(test)]
mod tests;

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::eval::Metric;

pub use csp::{ComponentOrder, Csp};
pub use lda::{Lda, LdaSolver};
pub use params::{ParamValue, Shrinkage, StageParams};
pub use registry::{PipelineTemplate, StageRegistry, StageSpec};
pub use scaler::StandardScaler;

/// Classifier input: `(n_samples, n_features)`
pub type Features = Array2<f64>;

/// A stage that learns state from labelled data.
pub trait Fittable<X>: Send {
    /// Learn stage state from `x` and labels `y`
    fn fit(&mut self, x: &X, y: &[usize]) -> Result<()>;

    /// Whether [`fit`](Self::fit) has completed successfully
    fn is_fitted(&self) -> bool;

    /// Registry name of the stage
    fn name(&self) -> &'static str;

    /// Effective hyperparameters, defaults included
    fn params(&self) -> StageParams {
        StageParams::new()
    }
}

/// A fittable stage mapping `X` to a feature matrix.
pub trait Transformer<X>: Fittable<X> {
    /// Map samples to features. Fails with `NotFitted` before `fit`.
    fn transform(&self, x: &X) -> Result<Features>;

    /// `fit` followed by `transform` on the same data
    fn fit_transform(&mut self, x: &X, y: &[usize]) -> Result<Features> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

/// A fittable stage mapping features to class labels.
pub trait Predictor: Fittable<Features> {
    /// Predict one label per row. Fails with `NotFitted` before `fit`.
    fn predict(&self, x: &Features) -> Result<Vec<usize>>;
}

/// Extractor + classifier.
pub struct Pipeline<X> {
    extractor: Box<dyn Transformer<X>>,
    classifier: Box<dyn Predictor>,
}

impl<X> Pipeline<X> {
    /// Compose two stages
    pub fn new(extractor: Box<dyn Transformer<X>>, classifier: Box<dyn Predictor>) -> Self {
        Self {
            extractor,
            classifier,
        }
    }

    /// Fit the extractor on `x`, then the classifier on the extracted features.
    pub fn fit(&mut self, x: &X, y: &[usize]) -> Result<()> {
        let features = self.extractor.fit_transform(x, y)?;
        self.classifier.fit(&features, y)
    }

    /// Predict labels for `x`
    pub fn predict(&self, x: &X) -> Result<Vec<usize>> {
        if !self.extractor.is_fitted() {
            return Err(Error::NotFitted {
                stage: self.extractor.name(),
            });
        }
        if !self.classifier.is_fitted() {
            return Err(Error::NotFitted {
                stage: self.classifier.name(),
            });
        }
        let features = self.extractor.transform(x)?;
        self.classifier.predict(&features)
    }

    /// Predict `x` and score against `y`
    pub fn score(&self, x: &X, y: &[usize], metric: Metric) -> Result<f64> {
        let predictions = self.predict(x)?;
        metric.score(y, &predictions)
    }

    /// Both stages fitted
    pub fn is_fitted(&self) -> bool {
        self.extractor.is_fitted() && self.classifier.is_fitted()
    }

    /// `"extractor+classifier"`
    pub fn describe(&self) -> String {
        format!("{}+{}", self.extractor.name(), self.classifier.name())
    }

    /// Effective hyperparameters keyed `stage.param`
    pub fn params(&self) -> Vec<(String, ParamValue)> {
        let stages = [
            (self.extractor.name(), self.extractor.params()),
            (self.classifier.name(), self.classifier.params()),
        ];
        let mut out = Vec::new();
        for (stage, params) in &stages {
            out.extend(
                params
                    .iter()
                    .map(|(k, v)| (format!("{stage}.{k}"), v.clone())),
            );
        }
        out
    }
}

impl<X> std::fmt::Debug for Pipeline<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.describe())
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

/// Sorted distinct labels
pub(crate) fn unique_labels(y: &[usize]) -> Vec<usize> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}
