//! Trellis CLI - build orchestration for component-based web applications.
//!
//! Main entry point: parses command-line arguments, initializes logging,
//! and dispatches to the command implementations.

use clap::Parser;
use miette::Result;
use trellis_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging and colors based on global flags
    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors();

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(dev_args).await,
    };

    // Convert CLI errors to miette diagnostics for readable error reports
    result.map_err(error::cli_error_to_miette)
}
