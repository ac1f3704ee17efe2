//! End-to-end experiment driver
//!
//! Ties a validated [`ExperimentConfig`] to the data loader, the stage
//! registry matching the rank of X, the orchestrator selected by
//! `experiment.mode` and, when `tracking:` is configured, a file-backed
//! tracker.

use std::path::PathBuf;

use log::{debug, info};

use crate::config::{ExperimentConfig, ExperimentSpec};
use crate::data::{load_dataset, Dataset, LoadedDataset, Samples};
use crate::error::Result;
use crate::eval::ReportWriter;
use crate::orchestrate::{NestedCv, NoopObserver, RepeatedCv, RunMode, RunObserver, RunReport};
use crate::pipeline::{PipelineTemplate, StageRegistry, StageSpec};
use crate::tracking::storage::JsonFileBackend;
use crate::tracking::{ExperimentTracker, Run, TrackerObserver};

/// Default extractor for `(trials, channels, times)` input
pub const DEFAULT_TRIALS_EXTRACTOR: &str = "csp";

/// Default extractor for `(samples, features)` input
pub const DEFAULT_FEATURES_EXTRACTOR: &str = "scaler";

/// What a finished experiment produced
#[derive(Debug, Clone)]
pub struct ExperimentOutcome {
    /// `sub_{subject_id}-{dataset_type}-{cv_name}-seed{seed}`
    pub run_name: String,
    /// Mode that was run
    pub mode: RunMode,
    /// Fold records and summary
    pub report: RunReport,
    /// Directory holding the result files
    pub output_dir: PathBuf,
    /// The closed tracker run, if tracking was configured
    pub tracking_run: Option<Run>,
}

/// Run the experiment described by `config`.
///
/// Writes `effective_config.yaml` and the report files into the resolved
/// output directory. Any fold failure aborts the whole experiment.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentOutcome> {
    let spec = &config.spec;
    let paths = config.paths()?;
    let run_name = spec.run_name();
    info!("Starting {} ({} mode)", run_name, spec.experiment.mode);

    let dumped = config.dump_effective(&paths.output_dir)?;
    debug!("Effective configuration written to {}", dumped.display());

    let dataset = load_dataset(&paths.x, &paths.y)?;
    info!(
        "Loaded {} samples from {}",
        dataset.len(),
        paths.x.display()
    );
    let writer = config.report_writer(&paths.output_dir);

    let mut tracked = match &paths.tracking_dir {
        Some(dir) => {
            let tracker =
                ExperimentTracker::new(tracking_experiment(spec), JsonFileBackend::new(dir));
            Some(TrackerObserver::new(tracker, &run_name).with_config_text(config.to_json()?))
        }
        None => None,
    };
    let mut untracked = NoopObserver;
    let observer: &mut dyn RunObserver = match tracked.as_mut() {
        Some(observer) => observer,
        None => &mut untracked,
    };

    let report = match &dataset {
        LoadedDataset::Trials(ds) => evaluate(
            config,
            StageRegistry::trials(),
            DEFAULT_TRIALS_EXTRACTOR,
            ds,
            writer,
            observer,
        )?,
        LoadedDataset::Features(ds) => evaluate(
            config,
            StageRegistry::features(),
            DEFAULT_FEATURES_EXTRACTOR,
            ds,
            writer,
            observer,
        )?,
    };

    let tracking_run = match tracked {
        Some(observer) => {
            let run_id = observer.run_id().map(str::to_string);
            let tracker = observer.into_tracker();
            match run_id {
                Some(id) => Some(tracker.get_run(&id)?),
                None => None,
            }
        }
        None => None,
    };

    Ok(ExperimentOutcome {
        run_name,
        mode: spec.experiment.mode,
        report,
        output_dir: paths.output_dir,
        tracking_run,
    })
}

/// Tracking experiment name: `tracking.experiment`, else `experiment.name`
fn tracking_experiment(spec: &ExperimentSpec) -> String {
    spec.tracking
        .as_ref()
        .and_then(|t| t.experiment.clone())
        .unwrap_or_else(|| spec.experiment.name.clone())
}

/// Runs already recorded for this configuration's tracking experiment.
///
/// Empty when `tracking:` is absent or nothing has been stored yet.
pub fn tracked_runs(config: &ExperimentConfig) -> Result<Vec<Run>> {
    let Some(dir) = config.paths()?.tracking_dir else {
        return Ok(Vec::new());
    };
    let tracker = ExperimentTracker::new(
        tracking_experiment(&config.spec),
        JsonFileBackend::new(dir),
    );
    Ok(tracker.list_runs()?)
}

fn evaluate<X: Samples>(
    config: &ExperimentConfig,
    registry: StageRegistry<X>,
    default_extractor: &str,
    dataset: &Dataset<X>,
    writer: ReportWriter,
    observer: &mut dyn RunObserver,
) -> Result<RunReport> {
    let spec = &config.spec;
    let extractor = spec
        .pipeline
        .extractor
        .as_deref()
        .unwrap_or(default_extractor);
    let classifier = spec.pipeline.classifier.as_str();
    let template = PipelineTemplate::new(
        registry,
        StageSpec::with_params(extractor, spec.stage_params(extractor)),
        StageSpec::with_params(classifier, spec.stage_params(classifier)),
    )?;

    match spec.experiment.mode {
        RunMode::Nested => NestedCv::new(
            &template,
            &spec.param_grid,
            spec.outer_folds(),
            spec.inner_folds(),
        )
        .with_metric(spec.pipeline.metric)
        .with_parallel(spec.search.parallel)
        .with_report(writer)
        .run(dataset, observer),
        RunMode::Repeated => RepeatedCv::new(&template, spec.outer_folds())
            .with_metric(spec.pipeline.metric)
            .with_report(writer)
            .run(dataset, observer),
    }
}
