//! Declarative experiment configuration
//!
//! A YAML file names the experiment, the input files, the pipeline stages
//! and their base hyperparameters, the fold setup, the searched grid and
//! where results go:
//!
//! ```yaml
//! experiment: { name: mi_csp_lda, seed: 42, mode: nested }
//! data:
//!   subject_id: "01"
//!   dataset_type: raw
//!   x_path: data/sub_{subject_id}/{dataset_type}/X.json
//!   y_path: data/sub_{subject_id}/{dataset_type}/y.json
//! csp: { n_components: 4, reg: null, log: true }
//! lda: { solver: lsqr, shrinkage: auto }
//! cv:
//!   rskf: { name: rskf, n_splits: 5, n_repeats: 10, random_state: 42 }
//!   skf: { n_splits: 5, shuffle: true, random_state: 42 }
//! param_grid:
//!   csp: { n_components: [2, 4, 6] }
//!   lda: { shrinkage: [null, auto] }
//! output: { dir: results/sub_{subject_id}/{dataset_type} }
//! tracking: { uri: mlruns }
//! ```
//!
//! Relative paths resolve against the configuration file's directory.

pub mod cli;
mod loader;
mod schema;
mod template;
mod validate;


pub use cli::{apply_overrides, parse_args, Cli, Command, InfoArgs, OutputFormat, RunArgs, ValidateArgs};
pub use loader::{load_config, parse_config, ExperimentConfig, ResolvedPaths, EFFECTIVE_CONFIG_FILE};
pub use schema::{
    CvSection, DataSection, ExperimentSection, ExperimentSpec, KFoldSection, OutputSection,
    PipelineSection, RepeatedKFoldSection, SearchSection, TrackingSection,
};
pub use template::{format_path_template, resolve_path, PathContext};
pub use validate::{validate_config, ValidationError};
