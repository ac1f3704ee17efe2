//! YAML schema for experiment configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::eval::{FoldConfig, Metric};
use crate::orchestrate::RunMode;
use crate::pipeline::StageParams;
use crate::search::ParamGrid;

/// Deserialize a bool from either a YAML boolean (`true`) or a quoted string (`"true"`).
fn deserialize_bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        Str(String),
    }

    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.to_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected 'true' or 'false', got '{other}'"
            ))),
        },
    }
}

/// Complete experiment specification
///
/// Any top-level section that is not one of the named fields is a stage
/// section (`csp:`, `lda:`, `scaler:`) holding that stage's base
/// hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    /// Name, seed and evaluation mode
    pub experiment: ExperimentSection,

    /// Input files and path-template context
    pub data: DataSection,

    /// Stage selection
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Outer and inner fold configuration
    #[serde(default)]
    pub cv: CvSection,

    /// Hyperparameter grid searched by nested runs
    #[serde(default)]
    pub param_grid: ParamGrid,

    /// Search execution
    #[serde(default)]
    pub search: SearchSection,

    /// Result files
    #[serde(default)]
    pub output: OutputSection,

    /// Optional tracking sink; absent means untracked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<TrackingSection>,

    /// Per-stage base hyperparameters, keyed by stage name
    #[serde(flatten)]
    pub stages: BTreeMap<String, StageParams>,
}

/// `experiment:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSection {
    /// Experiment name (also the default tracking experiment)
    pub name: String,

    /// Seed used wherever a `random_state` is not given
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Nested (default) or repeated evaluation
    #[serde(default)]
    pub mode: RunMode,
}

/// `data:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    /// Subject identifier substituted for `{subject_id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,

    /// Dataset variant substituted for `{dataset_type}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_type: Option<String>,

    /// Feature matrix file (path template)
    #[serde(alias = "X_path")]
    pub x_path: String,

    /// Label vector file (path template)
    pub y_path: String,
}

impl DataSection {
    /// `subject_id`, or `unknown`
    pub fn subject_id(&self) -> &str {
        self.subject_id.as_deref().unwrap_or("unknown")
    }

    /// `dataset_type`, or `unspecified`
    pub fn dataset_type(&self) -> &str {
        self.dataset_type.as_deref().unwrap_or("unspecified")
    }
}

/// `pipeline:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Extractor stage; defaults to `csp` for trials and `scaler` for
    /// feature rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,

    /// Classifier stage
    #[serde(default = "default_classifier")]
    pub classifier: String,

    /// Scoring metric
    #[serde(default)]
    pub metric: Metric,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            extractor: None,
            classifier: default_classifier(),
            metric: Metric::default(),
        }
    }
}

/// `cv:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvSection {
    /// Outer loop: repeated stratified k-fold
    #[serde(default)]
    pub rskf: RepeatedKFoldSection,

    /// Inner loop of nested runs: stratified k-fold
    #[serde(default)]
    pub skf: KFoldSection,
}

/// `cv.rskf:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatedKFoldSection {
    /// Short name used in the run name
    #[serde(default = "default_rskf_name")]
    pub name: String,

    /// Folds per repeat
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,

    /// Repeats
    #[serde(default = "default_n_repeats")]
    pub n_repeats: usize,

    /// Fold seed; falls back to `experiment.seed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

impl Default for RepeatedKFoldSection {
    fn default() -> Self {
        Self {
            name: default_rskf_name(),
            n_splits: default_n_splits(),
            n_repeats: default_n_repeats(),
            random_state: None,
        }
    }
}

/// `cv.skf:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KFoldSection {
    /// Folds
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,

    /// Shuffle before splitting
    #[serde(default = "default_true", deserialize_with = "deserialize_bool_lenient")]
    pub shuffle: bool,

    /// Fold seed; falls back to `experiment.seed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
}

impl Default for KFoldSection {
    fn default() -> Self {
        Self {
            n_splits: default_n_splits(),
            shuffle: true,
            random_state: None,
        }
    }
}

/// `search:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    /// Evaluate inner (combination, fold) pairs in parallel
    #[serde(default, deserialize_with = "deserialize_bool_lenient")]
    pub parallel: bool,
}

/// `output:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    /// Results directory (path template)
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Summary metrics file name
    #[serde(default = "default_metrics_file")]
    pub metrics_file: String,

    /// Per-fold scores file name
    #[serde(default = "default_folds_scores_file")]
    pub folds_scores_file: String,

    /// Per-fold best parameters file name (nested runs)
    #[serde(default = "default_best_params_file")]
    pub best_params_file: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            metrics_file: default_metrics_file(),
            folds_scores_file: default_folds_scores_file(),
            best_params_file: default_best_params_file(),
        }
    }
}

/// `tracking:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSection {
    /// Tracking store location: a directory path, optionally `file://`-prefixed
    pub uri: String,

    /// Tracking experiment; defaults to `experiment.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<String>,
}

impl ExperimentSpec {
    /// Fold configuration of the outer loop (and of repeated runs)
    pub fn outer_folds(&self) -> FoldConfig {
        let rskf = &self.cv.rskf;
        FoldConfig::repeated(
            rskf.n_splits,
            rskf.n_repeats,
            rskf.random_state.unwrap_or(self.experiment.seed),
        )
    }

    /// Fold configuration of the inner search
    pub fn inner_folds(&self) -> FoldConfig {
        let skf = &self.cv.skf;
        FoldConfig::stratified(
            skf.n_splits,
            skf.shuffle,
            skf.random_state.unwrap_or(self.experiment.seed),
        )
    }

    /// `sub_{subject_id}-{dataset_type}-{cv_name}-seed{seed}`
    pub fn run_name(&self) -> String {
        format!(
            "sub_{}-{}-{}-seed{}",
            self.data.subject_id(),
            self.data.dataset_type(),
            self.cv.rskf.name,
            self.experiment.seed
        )
    }

    /// Base hyperparameters of `stage` (empty if the section is absent)
    pub fn stage_params(&self, stage: &str) -> StageParams {
        self.stages.get(stage).cloned().unwrap_or_default()
    }
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

fn default_classifier() -> String {
    "lda".to_string()
}

fn default_rskf_name() -> String {
    "rskf".to_string()
}

fn default_n_splits() -> usize {
    5
}

fn default_n_repeats() -> usize {
    10
}

fn default_output_dir() -> String {
    "results/sub_{subject_id}/{dataset_type}".to_string()
}

fn default_metrics_file() -> String {
    "metrics.json".to_string()
}

fn default_folds_scores_file() -> String {
    "folds_scores.txt".to_string()
}

fn default_best_params_file() -> String {
    "best_params.json".to_string()
}
