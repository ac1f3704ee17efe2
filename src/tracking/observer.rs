//! Tracker adapter for evaluation passes

use log::{info, warn};

use super::storage::TrackingBackend;
use super::{ExperimentTracker, RunStatus};
use crate::error::{Error, Result};
use crate::orchestrate::{FoldRecord, RunEnd, RunObserver, RunStart};

/// Forwards run events to an [`ExperimentTracker`].
///
/// On start the named run is opened and the seed, fold configuration and
/// every effective stage hyperparameter are logged as params. Each fold logs
/// `<metric>_fold` at step = fold index; the end logs the summary metrics,
/// the configuration text and the output directory's files, then closes the
/// run as `Completed`. A failed pass closes it as `Failed`.
#[derive(Debug)]
pub struct TrackerObserver<B: TrackingBackend> {
    tracker: ExperimentTracker<B>,
    run_name: String,
    config_text: Option<String>,
    run_id: Option<String>,
    metric_prefix: String,
}

impl<B: TrackingBackend> TrackerObserver<B> {
    /// Observer opening a run called `run_name`
    pub fn new(tracker: ExperimentTracker<B>, run_name: impl Into<String>) -> Self {
        Self {
            tracker,
            run_name: run_name.into(),
            config_text: None,
            run_id: None,
            metric_prefix: String::new(),
        }
    }

    /// Effective configuration, logged as `config_used.json` at run end
    #[must_use]
    pub fn with_config_text(mut self, text: impl Into<String>) -> Self {
        self.config_text = Some(text.into());
        self
    }

    /// ID of the run opened by `on_run_start`
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Give the tracker back
    pub fn into_tracker(self) -> ExperimentTracker<B> {
        self.tracker
    }

    fn current_run(&self) -> Result<String> {
        self.run_id
            .clone()
            .ok_or_else(|| Error::InvalidInput("tracker run was never started".into()))
    }
}

impl<B: TrackingBackend> RunObserver for TrackerObserver<B> {
    fn on_run_start(&mut self, start: &RunStart) -> Result<()> {
        let run_id = self.tracker.start_run(Some(&self.run_name))?;
        self.metric_prefix = start.metric.name().to_string();

        let outer = start.outer;
        let mut params = vec![
            ("mode".to_string(), start.mode.to_string()),
            ("pipeline".to_string(), start.pipeline.clone()),
            ("metric".to_string(), start.metric.name().to_string()),
            ("seed".to_string(), outer.seed.to_string()),
            ("n_samples".to_string(), start.n_samples.to_string()),
            ("cv.n_splits".to_string(), outer.n_splits.to_string()),
            ("cv.n_repeats".to_string(), outer.n_repeats.to_string()),
            ("cv.shuffle".to_string(), outer.shuffle.to_string()),
        ];
        if let Some(inner) = start.inner {
            params.push(("inner_cv.n_splits".to_string(), inner.n_splits.to_string()));
            params.push(("inner_cv.seed".to_string(), inner.seed.to_string()));
        }
        params.extend(start.params.iter().map(|(k, v)| (k.clone(), v.to_string())));
        if let Some(grid) = &start.grid {
            for (key, values) in grid.axes() {
                let listed: Vec<String> = values.iter().map(ToString::to_string).collect();
                params.push((format!("grid.{key}"), format!("[{}]", listed.join(", "))));
            }
        }

        info!(
            "tracking {} as {}/{}",
            self.run_name,
            self.tracker.experiment_name(),
            run_id
        );
        self.run_id = Some(run_id.clone());
        self.tracker.log_params(&run_id, params)?;
        Ok(())
    }

    fn on_fold_end(&mut self, record: &FoldRecord) -> Result<()> {
        let run_id = self.current_run()?;
        let key = format!("{}_fold", self.metric_prefix);
        self.tracker
            .log_metric(&run_id, &key, record.score, record.index as u64)?;
        Ok(())
    }

    fn on_run_end(&mut self, end: &RunEnd<'_>) -> Result<()> {
        let run_id = self.current_run()?;
        let summary = end.summary;
        for (suffix, value) in [
            ("mean", summary.mean),
            ("std", summary.std),
            ("ci95_lo", summary.ci95_lo),
            ("ci95_hi", summary.ci95_hi),
        ] {
            let key = format!("{}_{suffix}", self.metric_prefix);
            self.tracker.log_metric(&run_id, &key, value, 0)?;
        }
        if let Some(text) = &self.config_text {
            self.tracker.log_text(&run_id, text, "config_used.json")?;
        }
        if let Some(dir) = &end.output_dir {
            self.tracker.log_artifacts(&run_id, dir)?;
        }
        self.tracker.end_run(&run_id, RunStatus::Completed)?;
        Ok(())
    }

    fn on_run_failed(&mut self, error: &Error) {
        let Some(run_id) = self.run_id.clone() else {
            return;
        };
        let message = error.to_string();
        let closed = self
            .tracker
            .log_param(&run_id, "error", &message)
            .and_then(|()| self.tracker.end_run(&run_id, RunStatus::Failed));
        if let Err(e) = closed {
            warn!("could not close tracker run {run_id}: {e}");
        }
    }
}
