//! Evaluation passes over outer folds
//!
//! Two orchestrators share one run loop:
//!
//! - [`NestedCv`]: grid search on each outer training partition, winner
//!   scored on the outer test partition
//! - [`RepeatedCv`]: fixed hyperparameters, one fit per split of a
//!   (possibly repeated) stratified k-fold
//!
//! A pass moves through [`RunState`]s `Init → OuterFold(i)* → Aggregate →
//! Done`, or ends in `Failed` on the first error. Outer folds run strictly
//! sequentially; a single [`RunObserver`] is notified at run start, after
//! every scored fold, at run end and on failure.

mod nested;
mod repeated;


use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eval::{FoldConfig, FoldSplit, Metric, ReportWriter, RunSummary, Splits};
use crate::pipeline::ParamValue;
use crate::search::{Combination, ParamGrid};

pub use nested::NestedCv;
pub use repeated::RepeatedCv;

/// Evaluation strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Grid search inside every outer fold
    #[default]
    Nested,
    /// Fixed hyperparameters over repeated stratified k-fold
    Repeated,
}

impl RunMode {
    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nested => "nested",
            Self::Repeated => "repeated",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "nested" => Ok(Self::Nested),
            "repeated" | "rskf" => Ok(Self::Repeated),
            other => Err(Error::Config(format!(
                "unknown mode '{other}' (expected nested or repeated)"
            ))),
        }
    }
}

/// Progress of an evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing evaluated yet
    Init,
    /// Evaluating the outer fold with this index
    OuterFold(usize),
    /// Every fold scored, summary pending
    Aggregate,
    /// Summary produced
    Done,
    /// Aborted by an error
    Failed,
}

/// Everything known about a pass before the first fold runs
#[derive(Debug, Clone)]
pub struct RunStart {
    /// Evaluation strategy
    pub mode: RunMode,
    /// Outer (or only) fold configuration
    pub outer: FoldConfig,
    /// Inner fold configuration of the search, nested passes only
    pub inner: Option<FoldConfig>,
    /// Scoring metric
    pub metric: Metric,
    /// Pipeline stages, `extractor+classifier`
    pub pipeline: String,
    /// Effective base hyperparameters keyed `stage.param`
    pub params: Vec<(String, ParamValue)>,
    /// Searched grid, nested passes only
    pub grid: Option<ParamGrid>,
    /// Number of samples in the dataset
    pub n_samples: usize,
}

/// One scored outer fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldRecord {
    /// Position in the split sequence
    pub index: usize,
    /// Repeat number
    pub repeat: usize,
    /// Fold number within the repeat
    pub fold: usize,
    /// Test-partition score
    pub score: f64,
    /// Training partition size
    pub train_size: usize,
    /// Test partition size
    pub test_size: usize,
    /// Winning hyperparameters (nested passes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_params: Option<Combination>,
    /// Mean inner validation score of the winner (nested passes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_score: Option<f64>,
}

/// End-of-run notification
#[derive(Debug, Clone)]
pub struct RunEnd<'a> {
    /// Aggregate over every fold
    pub summary: &'a RunSummary,
    /// Every fold record, in split order
    pub records: &'a [FoldRecord],
    /// Directory the report files were written to, if any
    pub output_dir: Option<PathBuf>,
}

/// Result of a completed pass
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-fold records in split order
    pub records: Vec<FoldRecord>,
    /// Aggregate
    pub summary: RunSummary,
    /// Terminal state (always `Done`)
    pub state: RunState,
}

impl RunReport {
    /// Fold scores in split order
    pub fn scores(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.score).collect()
    }
}

/// Hook into an evaluation pass.
///
/// All methods default to no-ops. An error returned from a hook aborts the
/// pass like a fold failure.
pub trait RunObserver {
    /// Called once before the first fold
    fn on_run_start(&mut self, _start: &RunStart) -> Result<()> {
        Ok(())
    }

    /// Called after each fold is scored
    fn on_fold_end(&mut self, _record: &FoldRecord) -> Result<()> {
        Ok(())
    }

    /// Called once after aggregation and persistence
    fn on_run_end(&mut self, _end: &RunEnd<'_>) -> Result<()> {
        Ok(())
    }

    /// Called once when the pass aborts
    fn on_run_failed(&mut self, _error: &Error) {}
}

/// Observer for untracked runs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Outcome of evaluating one outer split
struct FoldOutcome {
    score: f64,
    best_params: Option<Combination>,
    validation_score: Option<f64>,
}

/// The shared outer loop.
///
/// Any error moves the pass to `Failed`, notifies the observer and is
/// returned with the fold index attached.
fn drive<F>(
    start: &RunStart,
    splits: Splits<'_>,
    observer: &mut dyn RunObserver,
    report: Option<&ReportWriter>,
    evaluate: F,
) -> Result<RunReport>
where
    F: FnMut(&FoldSplit) -> Result<FoldOutcome>,
{
    let mut state = RunState::Init;
    match run_folds(start, splits, observer, report, evaluate, &mut state) {
        Ok(report) => Ok(report),
        Err(e) => {
            if let RunState::OuterFold(index) = state {
                error!("{} run failed in outer fold {}: {e}", start.mode, index + 1);
            } else {
                error!("{} run failed: {e}", start.mode);
            }
            state = RunState::Failed;
            debug!("run state: {state:?}");
            observer.on_run_failed(&e);
            Err(e)
        }
    }
}

fn run_folds<F>(
    start: &RunStart,
    splits: Splits<'_>,
    observer: &mut dyn RunObserver,
    report: Option<&ReportWriter>,
    mut evaluate: F,
    state: &mut RunState,
) -> Result<RunReport>
where
    F: FnMut(&FoldSplit) -> Result<FoldOutcome>,
{
    observer.on_run_start(start)?;

    let n_splits = start.outer.n_splits;
    let total = splits.len();
    let mut records = Vec::with_capacity(total);
    for split in splits {
        let index = split.index(n_splits);
        *state = RunState::OuterFold(index);
        debug!("run state: {state:?}");

        let outcome = evaluate(&split).map_err(|e| e.with_fold(index))?;
        let record = FoldRecord {
            index,
            repeat: split.repeat,
            fold: split.fold,
            score: outcome.score,
            train_size: split.train.len(),
            test_size: split.test.len(),
            best_params: outcome.best_params,
            validation_score: outcome.validation_score,
        };
        match (&record.best_params, record.validation_score) {
            (Some(params), Some(validation)) => info!(
                "fold {}/{total}: {} = {:.4} (inner {validation:.4}) with {params}",
                index + 1,
                start.metric,
                record.score,
            ),
            _ => info!(
                "fold {}/{total} (repeat {}, fold {}): {} = {:.4}",
                index + 1,
                record.repeat + 1,
                record.fold + 1,
                start.metric,
                record.score,
            ),
        }
        observer.on_fold_end(&record)?;
        records.push(record);
    }

    *state = RunState::Aggregate;
    debug!("run state: {state:?}");
    let scores: Vec<f64> = records.iter().map(|r| r.score).collect();
    let summary = RunSummary::from_scores(&scores)?;
    info!("{summary}");

    let output_dir = match report {
        Some(writer) => {
            writer.write_metrics(&summary)?;
            writer.write_fold_scores(&scores)?;
            if start.mode == RunMode::Nested {
                let best: Vec<&Combination> =
                    records.iter().filter_map(|r| r.best_params.as_ref()).collect();
                writer.write_best_params(&best)?;
            }
            info!("results written to {}", writer.dir().display());
            Some(writer.dir().to_path_buf())
        }
        None => None,
    };

    observer.on_run_end(&RunEnd {
        summary: &summary,
        records: &records,
        output_dir,
    })?;

    *state = RunState::Done;
    debug!("run state: {state:?}");
    Ok(RunReport {
        records,
        summary,
        state: *state,
    })
}
