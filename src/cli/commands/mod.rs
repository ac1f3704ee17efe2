//! CLI command implementations

mod info;
mod run;
mod validate;


use crate::cli::{init_logger, LogLevel};
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    // Configure output based on verbose/quiet flags
    let log_level = LogLevel::from_flags(cli.quiet, cli.verbose);
    init_logger(log_level);

    match cli.command {
        Command::Run(args) => run::run_run(args, log_level),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Info(args) => info::run_info(args, log_level),
    }
}
