//! # nestcv: nested cross-validation for two-stage classifiers
//!
//! nestcv estimates the generalization performance of an
//! extractor + classifier pipeline (CSP + LDA for multichannel trials,
//! scaler + LDA for feature rows) with hyperparameters tuned by an inner
//! grid search. The outer loop is repeated stratified k-fold; the search of
//! each outer fold only ever sees that fold's training partition.
//!
//! ## Architecture
//!
//! - `data`: datasets and JSON loading
//! - `eval`: fold generation, metrics, score aggregation and report files
//! - `pipeline`: stage traits, built-in stages and the stage registry
//! - `search`: parameter grids and cross-validated grid search
//! - `orchestrate`: nested and repeated evaluation passes
//! - `tracking`: experiment tracking and its run observer
//! - `config`: YAML configuration, validation and path templates
//! - `experiment`: configuration-driven end-to-end runs
//! - `cli`: command handlers for the `nestcv` binary
//!
//! ## Example
//!
//! ```
//! use ndarray::Array2;
//! use nestcv::data::Dataset;
//! use nestcv::eval::FoldConfig;
//! use nestcv::orchestrate::{NestedCv, NoopObserver};
//! use nestcv::pipeline::{PipelineTemplate, StageRegistry, StageSpec};
//! use nestcv::search::ParamGrid;
//!
//! # fn main() -> nestcv::Result<()> {
//! let x = Array2::from_shape_fn((24, 3), |(i, j)| {
//!     (i % 2) as f64 * 4.0 + ((i * 7 + j * 5) % 11) as f64 / 11.0
//! });
//! let y: Vec<usize> = (0..24).map(|i| i % 2).collect();
//! let dataset = Dataset::new(x, y)?;
//!
//! let template = PipelineTemplate::new(
//!     StageRegistry::features(),
//!     StageSpec::new("scaler"),
//!     StageSpec::new("lda"),
//! )?;
//! let grid = ParamGrid::new().with_axis("lda", "solver", ["svd", "lsqr"])?;
//!
//! let report = NestedCv::new(
//!     &template,
//!     &grid,
//!     FoldConfig::repeated(3, 2, 42),
//!     FoldConfig::stratified(2, true, 42),
//! )
//! .run(&dataset, &mut NoopObserver)?;
//!
//! assert_eq!(report.records.len(), 6);
//! println!("Mean BA: {:.3} ± {:.3}", report.summary.mean, report.summary.std);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod experiment;
pub mod linalg;
pub mod orchestrate;
pub mod pipeline;
pub mod search;
pub mod tracking;

pub use error::{Error, Result};
