//! Logging setup for the trellis CLI.
//!
//! Structured logging through the `tracing` ecosystem. Verbosity is
//! resolved in this order: `--verbose` (debug for trellis crates),
//! `--quiet` (errors only), `RUST_LOG`, then info by default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Call once at process start, before any logging occurs.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging (overrides `quiet`)
/// * `quiet` - Only show error-level logs
/// * `no_color` - Disable colored output
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("trellis=debug,trellis_bundler=debug,trellis_cli=debug")
    } else if quiet {
        EnvFilter::new("trellis=error,trellis_bundler=error,trellis_cli=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("trellis=info,trellis_bundler=info,trellis_cli=info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
