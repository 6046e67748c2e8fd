//! Trellis CLI - build orchestration for component-based web applications.
//!
//! This crate provides the command-line interface over the
//! `trellis-bundler` library: one-shot production builds (`trellis build`)
//! and a development server with watch mode and live reload
//! (`trellis dev`).
//!
//! # Architecture
//!
//! - [`error`] - Structured error types with actionable hints
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal output: status lines, size formatting, build summary
//! - `cli` - Argument parsing with clap
//! - `commands` - Individual CLI command implementations
//! - `config` - `trellis.config.json` loading and layering
//! - `dev` - Development server, watcher, and output diffing
//!
//! # Example
//!
//! ```rust
//! use trellis_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     // CLI command implementations...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
