//! Run command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{apply_overrides, load_config, RunArgs};
use crate::eval::Metric;
use crate::experiment::{run_experiment, ExperimentOutcome};

/// Short label used in the summary line
fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::BalancedAccuracy => "BA",
        Metric::Accuracy => "accuracy",
    }
}

/// `Mean BA: 0.812 ± 0.054`
pub fn format_summary_line(outcome: &ExperimentOutcome, metric: Metric) -> String {
    let summary = &outcome.report.summary;
    format!(
        "Mean {}: {:.3} ± {:.3}",
        metric_label(metric),
        summary.mean,
        summary.std
    )
}

/// One line per outer fold, with the winning parameters for nested runs
pub fn format_fold_lines(outcome: &ExperimentOutcome) -> Vec<String> {
    outcome
        .report
        .records
        .iter()
        .map(|record| match &record.best_params {
            Some(params) => format!(
                "  Fold {:>3} (repeat {}, fold {}): {:.4}  best: {params}",
                record.index, record.repeat, record.fold, record.score
            ),
            None => format!(
                "  Fold {:>3} (repeat {}, fold {}): {:.4}",
                record.index, record.repeat, record.fold, record.score
            ),
        })
        .collect()
}

pub fn run_run(args: RunArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Loading config: {}", args.config.display()),
    );

    let mut config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut config, &args);
    config
        .validate()
        .map_err(|e| format!("Config error: {e}"))?;

    let metric = config.spec.pipeline.metric;
    let outcome = run_experiment(&config).map_err(|e| format!("Run failed: {e}"))?;

    log(level, LogLevel::Verbose, "Per-fold scores:");
    for line in format_fold_lines(&outcome) {
        log(level, LogLevel::Verbose, &line);
    }

    let summary = &outcome.report.summary;
    log(level, LogLevel::Normal, &format_summary_line(&outcome, metric));
    log(
        level,
        LogLevel::Normal,
        &format!(
            "95% CI: [{:.3}, {:.3}] over {} folds",
            summary.ci95_lo, summary.ci95_hi, summary.n_folds
        ),
    );
    log(
        level,
        LogLevel::Normal,
        &format!("Results written to {}", outcome.output_dir.display()),
    );
    if let Some(run) = &outcome.tracking_run {
        log(
            level,
            LogLevel::Normal,
            &format!(
                "Tracked as {}/{} ({} artifacts)",
                run.experiment_name,
                run.run_id,
                run.artifacts.len()
            ),
        );
    }

    Ok(())
}
