//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, InfoArgs, OutputFormat};
use crate::eval::Metric;
use crate::experiment::tracked_runs;
use crate::tracking::Run;

/// One line per tracked run: ID, name, status and summary score
pub fn format_run_line(run: &Run, metric: Metric) -> String {
    let mean = run
        .latest_metric(&format!("{}_mean", metric.name()))
        .map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
    format!(
        "  {} {} {:?} mean={}",
        run.run_id,
        run.run_name.as_deref().unwrap_or("-"),
        run.status,
        mean
    )
}

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let spec = &config.spec;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Experiment: {}", spec.experiment.name);
            println!("Run name: {}", spec.run_name());
            println!("Mode: {}", spec.experiment.mode);
            println!(
                "Pipeline: {} + {}",
                spec.pipeline.extractor.as_deref().unwrap_or("auto"),
                spec.pipeline.classifier
            );
            let outer = spec.outer_folds();
            println!(
                "Outer folds: {} ({} × {})",
                outer.total_splits(),
                outer.n_splits,
                outer.n_repeats
            );

            if !spec.param_grid.axes().is_empty() {
                println!("Grid combinations: {}", spec.param_grid.len());
            }
            if let Some(tracking) = &spec.tracking {
                println!("Tracking: {}", tracking.uri);
                let runs = tracked_runs(&config).map_err(|e| format!("Tracking error: {e}"))?;
                println!("Tracked runs: {}", runs.len());
                for run in &runs {
                    println!("{}", format_run_line(run, spec.pipeline.metric));
                }
            }
        }
        OutputFormat::Json => {
            let json = config
                .to_json()
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = config
                .to_yaml()
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::storage::InMemoryBackend;
    use crate::tracking::{ExperimentTracker, RunStatus};

    #[test]
    fn test_format_run_line() {
        let mut tracker = ExperimentTracker::new("mi", InMemoryBackend::new());
        let id = tracker.start_run(Some("sub_01-raw-rskf-seed42")).unwrap();
        tracker
            .log_metric(&id, "balanced_accuracy_mean", 0.8123, 0)
            .unwrap();
        tracker.end_run(&id, RunStatus::Completed).unwrap();
        let run = tracker.get_run(&id).unwrap();

        assert_eq!(
            format_run_line(&run, Metric::BalancedAccuracy),
            "  run-1 sub_01-raw-rskf-seed42 Completed mean=0.812"
        );
        assert_eq!(
            format_run_line(&run, Metric::Accuracy),
            "  run-1 sub_01-raw-rskf-seed42 Completed mean=-"
        );
    }
}
