//! Error types for the trellis CLI.
//!
//! Top-level [`CliError`] covers broad failure categories; the
//! domain-specific [`ConfigError`] and [`BuildError`] carry actionable
//! hints. Conversion is automatic via `#[from]`, and [`ResultExt`]
//! attaches paths or hints at call sites.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading or validation failures.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build process failures.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors.
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors raised by the bundling core.
    #[error("Bundler error: {0}")]
    Bundler(#[from] trellis_bundler::Error),

    /// Generic errors with custom messages.
    #[error("{0}")]
    Custom(String),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location.
    #[error("Config file not found: {}\n\nHint: Create a trellis.config.json file or specify --config <path>", .0.display())]
    NotFound(PathBuf),

    /// Config file fails to parse or extract.
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    /// Missing required configuration field.
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },

    /// Mutually exclusive options were specified.
    #[error("Conflicting options: {0}\n\nHint: These options cannot be used together")]
    ConflictingOptions(String),

    /// I/O error while reading config.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Build execution errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Entry point file doesn't exist.
    #[error("Entry point not found: {}\n\nHint: Check the 'entryPoints' field in your config or --entry argument", .0.display())]
    EntryNotFound(PathBuf),

    /// One or more bundling diagnostics with error severity.
    #[error("Build failed with {0} error(s)\n\nHint: Fix the errors reported above and retry")]
    Failed(usize),

    /// Failed to write an output file.
    #[error("Failed to write '{}': {source}\n\nHint: Check output directory permissions", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output directory is not writable.
    #[error("Output directory is not writable: {}\n\nHint: Check directory permissions or specify a different --out-dir", .0.display())]
    OutputNotWritable(PathBuf),

    /// Generic build error.
    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` values.
pub trait ResultExt<T> {
    /// Attach a file path; a not-found I/O error becomes
    /// [`CliError::FileNotFound`].
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the rendered message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error with a context message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Convert a CLI error into a miette report for terminal rendering.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Bundler(inner) => miette::Report::new(inner),
        other => miette::Report::msg(other.to_string()),
    }
}
