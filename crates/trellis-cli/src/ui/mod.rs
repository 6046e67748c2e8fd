//! Terminal output utilities.
//!
//! Status messages, size/duration formatting, and the post-build bundle
//! summary table. Everything prints to stderr so build artifacts can be
//! piped from stdout.

mod format;
mod messages;

pub use format::{format_duration, format_size, print_build_summary, BundleRow};
pub use messages::{error, info, success, warning};

/// Whether color output should be enabled.
///
/// Respects `NO_COLOR` and `FORCE_COLOR`, falls back to terminal
/// detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Initialize global color support.
pub fn init_colors() {
    console::set_colors_enabled_stderr(should_use_color());
}
