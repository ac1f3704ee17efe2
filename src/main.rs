//! nestcv CLI
//!
//! Nested cross-validation entry point for the nestcv library.
//!
//! # Usage
//!
//! ```bash
//! # Nested CV from config
//! nestcv run config.yaml
//!
//! # Repeated evaluation with a different seed and results directory
//! nestcv run config.yaml --mode repeated --seed 7 --output-dir results/seed7
//!
//! # Validate config
//! nestcv validate config.yaml --detailed
//!
//! # Show config info
//! nestcv info config.yaml --format yaml
//! ```

use clap::Parser;
use nestcv::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
