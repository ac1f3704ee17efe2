//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! nestcv run config.yaml
//! nestcv run config.yaml --mode repeated --seed 7 --output-dir ./results
//! nestcv validate config.yaml
//! nestcv info config.yaml --format json
//! ```

mod core;
mod types;

#[cfg(test)]
mod tests;

pub use self::core::{apply_overrides, parse_args, Cli, Command, InfoArgs, RunArgs, ValidateArgs};
pub use types::OutputFormat;
