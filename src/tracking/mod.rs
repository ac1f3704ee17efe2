//! Experiment tracking
//!
//! Records the parameters, per-fold metrics, configuration text and result
//! artifacts of evaluation passes through a pluggable
//! [`TrackingBackend`](storage::TrackingBackend).
//!
//! - **`ExperimentTracker`**: handle that manages runs for a named experiment
//! - **`Run`**: one evaluation pass with params, metrics, texts and artifacts
//! - **`TrackerObserver`**: adapts a tracker to the orchestrators'
//!   [`RunObserver`](crate::orchestrate::RunObserver) hooks
//!
//! # Example
//!
//! ```
//! use nestcv::tracking::{ExperimentTracker, RunStatus};
//! use nestcv::tracking::storage::InMemoryBackend;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = ExperimentTracker::new("motor-imagery", InMemoryBackend::new());
//! let run_id = tracker.start_run(Some("sub_01-raw-rskf-seed42"))?;
//! tracker.log_param(&run_id, "seed", "42")?;
//! tracker.log_metric(&run_id, "balanced_accuracy_fold", 0.81, 0)?;
//! tracker.log_metric(&run_id, "balanced_accuracy_fold", 0.74, 1)?;
//! tracker.log_text(&run_id, "{\"seed\": 42}", "config_used.json")?;
//! tracker.end_run(&run_id, RunStatus::Completed)?;
//!
//! let run = tracker.get_run(&run_id)?;
//! assert_eq!(run.metrics["balanced_accuracy_fold"].len(), 2);
//! assert_eq!(run.latest_metric("balanced_accuracy_fold"), Some(0.74));
//! assert_eq!(tracker.list_runs()?.len(), 1);
//! # Ok(())
//! # }
//! ```

mod observer;
pub mod storage;


use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use storage::{TrackingBackend, TrackingStorageError};

pub use observer::TrackerObserver;

/// Status of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is actively recording
    Active,
    /// Run completed successfully
    Completed,
    /// Run failed
    Failed,
    /// Run was cancelled
    Cancelled,
}

/// One logged value of a metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Metric value
    pub value: f64,
    /// Step (fold index for per-fold metrics, 0 for summaries)
    pub step: u64,
}

/// A single experiment run, stored as-is by the backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier within the experiment
    pub run_id: String,
    /// Optional human-readable name
    pub run_name: Option<String>,
    /// Parent experiment name
    pub experiment_name: String,
    /// Current status
    pub status: RunStatus,
    /// Parameters: key -> value (string-encoded)
    pub params: BTreeMap<String, String>,
    /// Metrics: key -> logged points in logging order
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Text documents: label -> content
    #[serde(default)]
    pub texts: BTreeMap<String, String>,
    /// Artifact paths
    #[serde(default)]
    pub artifacts: Vec<String>,
    /// Unix timestamp (ms) when the run started
    pub start_time_ms: Option<u64>,
    /// Unix timestamp (ms) when the run ended
    pub end_time_ms: Option<u64>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Run {
    fn new(run_id: String, run_name: Option<String>, experiment_name: String) -> Self {
        Self {
            run_id,
            run_name,
            experiment_name,
            status: RunStatus::Active,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            texts: BTreeMap::new(),
            artifacts: Vec::new(),
            start_time_ms: Some(now_ms()),
            end_time_ms: None,
        }
    }

    /// Most recently logged value of `key`
    pub fn latest_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key)?.last().map(|point| point.value)
    }
}

/// Errors from experiment tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run is not active: {0}")]
    RunNotActive(String),

    #[error("Cannot read artifact directory {path}: {source}")]
    Artifacts {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] TrackingStorageError),
}

/// Result alias for tracking operations
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Experiment tracker
///
/// Manages multiple runs under a single experiment name. Run IDs continue
/// after those already persisted in the backend, so a tracker reopened on
/// the same directory never overwrites earlier runs.
#[derive(Debug)]
pub struct ExperimentTracker<B: TrackingBackend> {
    experiment_name: String,
    backend: B,
    /// Active runs held in memory for fast mutation
    active_runs: HashMap<String, Run>,
    next_run_id: u64,
}

impl<B: TrackingBackend> ExperimentTracker<B> {
    /// Create a new tracker for the given experiment name
    pub fn new(experiment_name: impl Into<String>, backend: B) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            backend,
            active_runs: HashMap::new(),
            next_run_id: 1,
        }
    }

    /// Get the experiment name
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Start a new run, optionally with a human-readable name
    ///
    /// Returns the run ID.
    pub fn start_run(&mut self, run_name: Option<&str>) -> Result<String> {
        let mut run_id = format!("run-{}", self.next_run_id);
        while self.active_runs.contains_key(&run_id)
            || self
                .backend
                .load_run(&self.experiment_name, &run_id)
                .is_ok()
        {
            self.next_run_id += 1;
            run_id = format!("run-{}", self.next_run_id);
        }
        self.next_run_id += 1;

        let run = Run::new(
            run_id.clone(),
            run_name.map(String::from),
            self.experiment_name.clone(),
        );
        self.active_runs.insert(run_id.clone(), run);
        Ok(run_id)
    }

    /// End a run with the given status, persisting it to the backend
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .active_runs
            .remove(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;

        run.status = status;
        run.end_time_ms = Some(now_ms());

        self.backend.save_run(&run)?;
        Ok(())
    }

    fn active_run(&mut self, run_id: &str) -> Result<&mut Run> {
        self.active_runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotActive(run_id.to_string()))
    }

    /// Log a single parameter
    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.active_run(run_id)?
            .params
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Log multiple parameters at once; later keys overwrite earlier ones
    pub fn log_params<I, K, V>(&mut self, run_id: &str, params: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let run = self.active_run(run_id)?;
        for (k, v) in params {
            run.params.insert(k.into(), v.into());
        }
        Ok(())
    }

    /// Log a metric value at a given step
    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()> {
        self.active_run(run_id)?
            .metrics
            .entry(key.to_string())
            .or_default()
            .push(MetricPoint { value, step });
        Ok(())
    }

    /// Attach a text document under `label` (e.g. `config_used.json`)
    pub fn log_text(&mut self, run_id: &str, content: &str, label: &str) -> Result<()> {
        self.active_run(run_id)?
            .texts
            .insert(label.to_string(), content.to_string());
        Ok(())
    }

    /// Log an artifact path
    pub fn log_artifact(&mut self, run_id: &str, path: &str) -> Result<()> {
        self.active_run(run_id)?.artifacts.push(path.to_string());
        Ok(())
    }

    /// Log every file under `dir` as an artifact, in sorted path order.
    ///
    /// Returns the number of files logged.
    pub fn log_artifacts(&mut self, run_id: &str, dir: &Path) -> Result<usize> {
        // Fail before touching the filesystem if the run is closed
        self.active_run(run_id)?;

        let mut files = Vec::new();
        collect_files(dir, &mut files).map_err(|source| TrackingError::Artifacts {
            path: dir.to_path_buf(),
            source,
        })?;
        files.sort();

        for file in &files {
            self.log_artifact(run_id, &file.display().to_string())?;
        }
        Ok(files.len())
    }

    /// Retrieve a run by ID
    ///
    /// Checks active (in-memory) runs first, then falls back to the backend.
    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        if let Some(run) = self.active_runs.get(run_id) {
            return Ok(run.clone());
        }
        match self.backend.load_run(&self.experiment_name, run_id) {
            Ok(run) => Ok(run),
            Err(TrackingStorageError::RunNotFound { .. }) => {
                Err(TrackingError::RunNotFound(run_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persisted runs of this experiment followed by still-active ones
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let mut runs = self.backend.list_runs(&self.experiment_name)?;
        let mut active: Vec<Run> = self
            .active_runs
            .values()
            .filter(|run| !runs.iter().any(|r| r.run_id == run.run_id))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        runs.extend(active);
        Ok(runs)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
