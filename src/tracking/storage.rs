//! Tracking storage backends
//!
//! Runs are grouped by experiment. `JsonFileBackend` keeps one document per
//! run under `{dir}/{experiment}/{run_id}.json`; `InMemoryBackend` holds
//! runs for the lifetime of the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::Run;

/// Errors from tracking storage operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingStorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed run document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Run not found: {experiment}/{run_id}")]
    RunNotFound { experiment: String, run_id: String },
}

/// Result alias for tracking storage operations
pub type Result<T> = std::result::Result<T, TrackingStorageError>;

/// Persistence seam of [`ExperimentTracker`](super::ExperimentTracker)
pub trait TrackingBackend {
    /// Store `run` under its experiment, replacing any earlier copy
    fn save_run(&mut self, run: &Run) -> Result<()>;

    /// Load one run of `experiment`
    fn load_run(&self, experiment: &str, run_id: &str) -> Result<Run>;

    /// Every stored run of `experiment`, in run-ID order
    fn list_runs(&self, experiment: &str) -> Result<Vec<Run>>;
}

/// Order `run-2` before `run-10`; IDs without a numeric suffix sort last.
fn sort_runs(runs: &mut [Run]) {
    runs.sort_by_key(|run| {
        let index = run
            .run_id
            .strip_prefix("run-")
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or(u64::MAX);
        (index, run.run_id.clone())
    });
}

/// Directory-safe form of an experiment name
fn experiment_dir_name(experiment: &str) -> String {
    let name: String = experiment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        name
    }
}

/// One JSON document per run, grouped in per-experiment directories.
///
/// # Example
///
/// ```no_run
/// use nestcv::tracking::storage::JsonFileBackend;
/// use nestcv::tracking::ExperimentTracker;
///
/// let backend = JsonFileBackend::new("mlruns");
/// let tracker = ExperimentTracker::new("motor-imagery", backend);
/// ```
#[derive(Debug)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Store rooted at `dir`; directories are created on first save
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Directory holding the runs of `experiment`
    pub fn experiment_dir(&self, experiment: &str) -> PathBuf {
        self.dir.join(experiment_dir_name(experiment))
    }

    fn run_path(&self, experiment: &str, run_id: &str) -> PathBuf {
        self.experiment_dir(experiment).join(format!("{run_id}.json"))
    }

    fn read_run(path: &Path) -> Result<Run> {
        let json = fs::read_to_string(path).map_err(|source| TrackingStorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| TrackingStorageError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl TrackingBackend for JsonFileBackend {
    fn save_run(&mut self, run: &Run) -> Result<()> {
        let dir = self.experiment_dir(&run.experiment_name);
        fs::create_dir_all(&dir).map_err(|source| TrackingStorageError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = self.run_path(&run.experiment_name, &run.run_id);
        let json = serde_json::to_string_pretty(run).map_err(|source| {
            TrackingStorageError::Json {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| TrackingStorageError::Io { path, source })
    }

    fn load_run(&self, experiment: &str, run_id: &str) -> Result<Run> {
        let path = self.run_path(experiment, run_id);
        if !path.is_file() {
            return Err(TrackingStorageError::RunNotFound {
                experiment: experiment.to_string(),
                run_id: run_id.to_string(),
            });
        }
        Self::read_run(&path)
    }

    fn list_runs(&self, experiment: &str) -> Result<Vec<Run>> {
        let dir = self.experiment_dir(experiment);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|source| TrackingStorageError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut runs = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| TrackingStorageError::Io {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                runs.push(Self::read_run(&path)?);
            }
        }
        sort_runs(&mut runs);
        Ok(runs)
    }
}

/// Runs kept in memory, keyed by `(experiment, run_id)`
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    runs: BTreeMap<(String, String), Run>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingBackend for InMemoryBackend {
    fn save_run(&mut self, run: &Run) -> Result<()> {
        self.runs.insert(
            (run.experiment_name.clone(), run.run_id.clone()),
            run.clone(),
        );
        Ok(())
    }

    fn load_run(&self, experiment: &str, run_id: &str) -> Result<Run> {
        self.runs
            .get(&(experiment.to_string(), run_id.to_string()))
            .cloned()
            .ok_or_else(|| TrackingStorageError::RunNotFound {
                experiment: experiment.to_string(),
                run_id: run_id.to_string(),
            })
    }

    fn list_runs(&self, experiment: &str) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self
            .runs
            .iter()
            .filter(|((exp, _), _)| exp == experiment)
            .map(|(_, run)| run.clone())
            .collect();
        sort_runs(&mut runs);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_dir_name_is_sanitized() {
        assert_eq!(experiment_dir_name("mi_csp-lda.v2"), "mi_csp-lda.v2");
        assert_eq!(experiment_dir_name("sub 01/raw"), "sub_01_raw");
        assert_eq!(experiment_dir_name(".."), "_");
        assert_eq!(experiment_dir_name(""), "_");
    }

    #[test]
    fn test_sort_runs_numeric() {
        let mut runs: Vec<Run> = ["run-10", "custom", "run-2", "run-1"]
            .iter()
            .map(|id| Run::new(id.to_string(), None, "e".into()))
            .collect();
        sort_runs(&mut runs);
        let ids: Vec<&str> = runs.iter().map(|r| r.run_id.as_str()).collect();
        assert_eq!(ids, vec!["run-1", "run-2", "run-10", "custom"]);
    }
}
