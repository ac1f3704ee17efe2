//! Stage registry and pipeline templates

use std::collections::BTreeMap;

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use super::{
    Csp, Features, Lda, ParamValue, Pipeline, Predictor, StageParams, StandardScaler, Transformer,
};
use crate::error::{Error, Result};
use crate::search::{Combination, ParamGrid};

/// Constructor for a feature extractor over `X`
pub type ExtractorFactory<X> = fn(&StageParams) -> Result<Box<dyn Transformer<X>>>;

/// Constructor for a classifier
pub type ClassifierFactory = fn(&StageParams) -> Result<Box<dyn Predictor>>;

/// Name → constructor mapping for the stages a pipeline over `X` may use.
pub struct StageRegistry<X> {
    extractors: BTreeMap<String, ExtractorFactory<X>>,
    classifiers: BTreeMap<String, ClassifierFactory>,
}

impl<X> StageRegistry<X> {
    /// Registry with no stages
    pub fn empty() -> Self {
        Self {
            extractors: BTreeMap::new(),
            classifiers: BTreeMap::new(),
        }
    }

    /// Register (or replace) an extractor
    pub fn register_extractor(&mut self, name: impl Into<String>, factory: ExtractorFactory<X>) {
        self.extractors.insert(name.into(), factory);
    }

    /// Register (or replace) a classifier
    pub fn register_classifier(&mut self, name: impl Into<String>, factory: ClassifierFactory) {
        self.classifiers.insert(name.into(), factory);
    }

    /// Registered extractor names
    pub fn extractor_names(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(String::as_str)
    }

    /// Registered classifier names
    pub fn classifier_names(&self) -> impl Iterator<Item = &str> {
        self.classifiers.keys().map(String::as_str)
    }

    fn extractor(&self, name: &str) -> Result<ExtractorFactory<X>> {
        self.extractors.get(name).copied().ok_or_else(|| {
            Error::Config(format!(
                "unknown extractor '{name}' (available: {})",
                self.extractor_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    fn classifier(&self, name: &str) -> Result<ClassifierFactory> {
        self.classifiers.get(name).copied().ok_or_else(|| {
            Error::Config(format!(
                "unknown classifier '{name}' (available: {})",
                self.classifier_names().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

fn lda_classifier(params: &StageParams) -> Result<Box<dyn Predictor>> {
    Ok(Box::new(Lda::from_params(params)?))
}

impl StageRegistry<Array3<f64>> {
    /// Stages for multichannel trials: `csp` extractor, `lda` classifier
    pub fn trials() -> Self {
        fn csp(params: &StageParams) -> Result<Box<dyn Transformer<Array3<f64>>>> {
            Ok(Box::new(Csp::from_params(params)?))
        }

        let mut registry = Self::empty();
        registry.register_extractor(Csp::NAME, csp);
        registry.register_classifier(Lda::NAME, lda_classifier);
        registry
    }
}

impl StageRegistry<Array2<f64>> {
    /// Stages for feature rows: `scaler` extractor, `lda` classifier
    pub fn features() -> Self {
        fn scaler(params: &StageParams) -> Result<Box<dyn Transformer<Features>>> {
            Ok(Box::new(StandardScaler::from_params(params)?))
        }

        let mut registry = Self::empty();
        registry.register_extractor(StandardScaler::NAME, scaler);
        registry.register_classifier(Lda::NAME, lda_classifier);
        registry
    }
}

impl<X> std::fmt::Debug for StageRegistry<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .field("classifiers", &self.classifiers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A stage name and its base hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Registry name
    pub name: String,
    /// Base hyperparameters
    #[serde(default)]
    pub params: StageParams,
}

impl StageSpec {
    /// Spec with no base parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: StageParams::new(),
        }
    }

    /// Spec with base parameters
    pub fn with_params(name: impl Into<String>, params: StageParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Recipe for fresh, unfit pipelines.
///
/// The base parameters of each stage are overlaid with a grid combination at
/// build time; every build returns independent stage instances.
#[derive(Debug)]
pub struct PipelineTemplate<X> {
    registry: StageRegistry<X>,
    extractor: StageSpec,
    classifier: StageSpec,
}

impl<X> PipelineTemplate<X> {
    /// Bind extractor and classifier specs. Fails on unknown stage names or
    /// invalid base parameters.
    pub fn new(
        registry: StageRegistry<X>,
        extractor: StageSpec,
        classifier: StageSpec,
    ) -> Result<Self> {
        if extractor.name == classifier.name {
            return Err(Error::Config(format!(
                "extractor and classifier are both '{}'",
                extractor.name
            )));
        }
        let template = Self {
            registry,
            extractor,
            classifier,
        };
        template.build(&Combination::new())?;
        Ok(template)
    }

    /// Extractor spec
    pub fn extractor(&self) -> &StageSpec {
        &self.extractor
    }

    /// Classifier spec
    pub fn classifier(&self) -> &StageSpec {
        &self.classifier
    }

    /// Fresh pipeline with `combination` applied over the base parameters.
    pub fn build(&self, combination: &Combination) -> Result<Pipeline<X>> {
        let mut extractor_params = self.extractor.params.clone();
        let mut classifier_params = self.classifier.params.clone();
        for (key, value) in combination.iter() {
            if key.stage == self.extractor.name {
                extractor_params.set(key.name.clone(), value.clone());
            } else if key.stage == self.classifier.name {
                classifier_params.set(key.name.clone(), value.clone());
            } else {
                return Err(Error::Config(format!(
                    "{key} targets stage '{}' which is not in the pipeline ({} + {})",
                    key.stage, self.extractor.name, self.classifier.name
                )));
            }
        }

        let make_extractor = self.registry.extractor(&self.extractor.name)?;
        let make_classifier = self.registry.classifier(&self.classifier.name)?;
        Ok(Pipeline::new(
            make_extractor(&extractor_params)?,
            make_classifier(&classifier_params)?,
        ))
    }

    /// Build every combination once so malformed grids fail before any fold
    /// runs.
    pub fn validate(&self, grid: &ParamGrid) -> Result<()> {
        for combination in grid.combinations()? {
            self.build(&combination).map_err(|e| match e {
                Error::Config(msg) => {
                    Error::Config(format!("param_grid combination {combination}: {msg}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Effective base hyperparameters keyed `stage.param`, defaults included
    pub fn base_params(&self) -> Result<Vec<(String, ParamValue)>> {
        Ok(self.build(&Combination::new())?.params())
    }
}
