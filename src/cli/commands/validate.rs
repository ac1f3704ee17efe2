//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_config, ExperimentConfig, ValidateArgs};

/// Format the data section and resolved input paths
pub fn format_data_info(config: &ExperimentConfig) -> String {
    let data = &config.spec.data;
    let mut lines = vec![
        format!("  Subject: {}", data.subject_id()),
        format!("  Dataset type: {}", data.dataset_type()),
    ];
    match config.paths() {
        Ok(paths) => {
            lines.push(format!("  X: {}", paths.x.display()));
            lines.push(format!("  y: {}", paths.y.display()));
            lines.push(format!("  Output dir: {}", paths.output_dir.display()));
        }
        Err(e) => lines.push(format!("  Paths: {e}")),
    }
    lines.join("\n")
}

/// Format pipeline stages and their base hyperparameters
pub fn format_pipeline_info(config: &ExperimentConfig) -> String {
    let spec = &config.spec;
    let mut lines = vec![
        format!(
            "  Extractor: {}",
            spec.pipeline.extractor.as_deref().unwrap_or("(by input rank)")
        ),
        format!("  Classifier: {}", spec.pipeline.classifier),
        format!("  Metric: {}", spec.pipeline.metric),
    ];
    for (stage, params) in &spec.stages {
        for (name, value) in params.iter() {
            lines.push(format!("    {stage}.{name} = {value}"));
        }
    }
    lines.join("\n")
}

/// Format outer and inner fold setup
pub fn format_cv_info(config: &ExperimentConfig) -> String {
    let spec = &config.spec;
    let outer = spec.outer_folds();
    let inner = spec.inner_folds();
    format!(
        "  Mode: {}\n  Outer: {} splits × {} repeats (seed {})\n  Inner: {} splits, shuffle={} (seed {})",
        spec.experiment.mode,
        outer.n_splits,
        outer.n_repeats,
        outer.seed,
        inner.n_splits,
        inner.shuffle,
        inner.seed
    )
}

/// Format the searched grid, if any
pub fn format_grid_info(config: &ExperimentConfig) -> Option<String> {
    let grid = &config.spec.param_grid;
    if grid.axes().is_empty() {
        return None;
    }
    let mut lines = vec![format!("  Param grid ({} combinations):", grid.len())];
    for (key, values) in grid.axes() {
        let listed: Vec<String> = values.iter().map(ToString::to_string).collect();
        lines.push(format!("    {key}: [{}]", listed.join(", ")));
    }
    Some(lines.join("\n"))
}

/// Print detailed configuration summary
pub fn print_detailed_summary(config: &ExperimentConfig) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_data_info(config));
    println!();
    println!("{}", format_pipeline_info(config));
    println!();
    println!("{}", format_cv_info(config));

    if let Some(grid_info) = format_grid_info(config) {
        println!();
        println!("{grid_info}");
    }
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let config = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    config
        .paths()
        .map_err(|e| format!("Validation failed: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        print_detailed_summary(&config);
    }

    Ok(())
}
