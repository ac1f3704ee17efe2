//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;
use crate::config::ExperimentConfig;
use crate::orchestrate::RunMode;

/// nestcv: nested cross-validation for two-stage classification pipelines
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "nestcv")]
#[command(version)]
#[command(
    about = "Nested cross-validation with embedded grid search for CSP + LDA style pipelines"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run an evaluation from YAML configuration
    Run(RunArgs),

    /// Validate a configuration file without running it
    Validate(ValidateArgs),

    /// Display information about a configuration
    Info(InfoArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Override evaluation mode (nested, repeated)
    #[arg(short, long)]
    pub mode: Option<RunMode>,

    /// Override results directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override experiment seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Evaluate grid points in parallel
    #[arg(long)]
    pub parallel: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Show the resolved configuration
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a loaded configuration
///
/// A relative `--output-dir` is taken relative to the working directory,
/// not the configuration file.
pub fn apply_overrides(config: &mut ExperimentConfig, args: &RunArgs) {
    let spec = &mut config.spec;
    if let Some(mode) = args.mode {
        spec.experiment.mode = mode;
    }
    if let Some(seed) = args.seed {
        spec.experiment.seed = seed;
    }
    if args.parallel {
        spec.search.parallel = true;
    }
    if let Some(output_dir) = &args.output_dir {
        let absolute = if output_dir.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(output_dir))
                .unwrap_or_else(|_| output_dir.clone())
        } else {
            output_dir.clone()
        };
        spec.output.dir = absolute.display().to_string();
    }
}
