//! Command implementations for the Trellis CLI.
//!
//! - [`build`] - One-shot production build
//! - [`dev`] - Development server with watch mode and live reload
//!
//! Each command is implemented in its own module and provides an `execute`
//! function that takes the parsed command arguments and returns a Result.

pub mod build;
pub mod dev;

// Re-export execute functions for convenience
pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
