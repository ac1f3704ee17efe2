//! Evaluation primitives
//!
//! ## Architecture
//!
//! - `folds`: stratified (repeated) k-fold split generation
//! - `classification`: confusion matrix and balanced accuracy
//! - `metric`: the scoring metric applied to held-out partitions
//! - `summary`: fold score aggregation and result files
//!
//! ## Example
//!
//! ```
//! use nestcv::eval::{FoldConfig, FoldGenerator, RunSummary};
//!
//! let y = vec![0, 0, 0, 1, 1, 1];
//! let folds = FoldGenerator::new(FoldConfig::stratified(3, true, 42), &y).unwrap();
//! assert_eq!(folds.splits().count(), 3);
//!
//! let summary = RunSummary::from_scores(&[0.5, 0.75, 1.0]).unwrap();
//! assert_eq!(summary.mean, 0.75);
//! ```

pub mod classification;
pub mod folds;
pub mod metric;
pub mod summary;

pub use classification::{balanced_accuracy, ConfusionMatrix};
pub use folds::{FoldConfig, FoldGenerator, FoldSplit, Splits};
pub use metric::Metric;
pub use summary::{read_fold_scores, ReportWriter, RunSummary};
