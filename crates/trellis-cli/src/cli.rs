//! Command-line interface definition.
//!
//! Defined with clap's derive macros. Global flags (`--verbose`,
//! `--quiet`, `--no-color`) apply to every subcommand.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Trellis - build orchestration for component-based web applications
#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Build orchestration for component-based web applications",
    long_about = "Trellis drives incremental multi-bundle builds: application code,\n\
                  global style and script groups, and optional server code are bundled\n\
                  concurrently, merged deterministically, and post-processed into a\n\
                  deployable output tree."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one production build
    Build(BuildArgs),
    /// Start the development server with watch mode
    Dev(DevArgs),
}

/// Arguments for `trellis build`.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Entry point files (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub entry: Vec<String>,

    /// Path to trellis.config.json
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Enable script and style optimization
    #[arg(long)]
    pub optimize: bool,

    /// Append content hashes to output file names
    #[arg(long)]
    pub output_hashing: bool,

    /// Generate sourcemaps
    #[arg(long)]
    pub sourcemap: bool,

    /// Document base href, e.g. /app/
    #[arg(long, value_name = "HREF")]
    pub base_href: Option<String>,

    /// Emit the dependency graph as stats.json
    #[arg(long)]
    pub stats_json: bool,

    /// Remove the output directory before building
    #[arg(long)]
    pub clean: bool,
}

/// Arguments for `trellis dev`.
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Entry point files (overrides config)
    #[arg(short, long, value_name = "FILE")]
    pub entry: Vec<String>,

    /// Path to trellis.config.json
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Project root directory
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Port to serve on
    #[arg(short, long, default_value_t = 4200)]
    pub port: u16,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Debounce window for file-change events, in milliseconds
    #[arg(long, default_value_t = 150, value_name = "MS")]
    pub debounce: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_accepts_repeated_entries() {
        let cli = Cli::parse_from([
            "trellis", "build", "--entry", "src/main.ts", "--entry", "src/admin.ts",
        ]);
        match cli.command {
            Command::Build(args) => assert_eq!(args.entry.len(), 2),
            _ => panic!("expected build command"),
        }
    }

    #[test]
    fn dev_defaults_port_and_host() {
        let cli = Cli::parse_from(["trellis", "dev"]);
        match cli.command {
            Command::Dev(args) => {
                assert_eq!(args.port, 4200);
                assert_eq!(args.host, "127.0.0.1");
            }
            _ => panic!("expected dev command"),
        }
    }
}
