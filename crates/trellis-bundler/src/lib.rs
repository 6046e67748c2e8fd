//! # trellis-bundler
//!
//! Build orchestration core for the trellis application framework.
//!
//! This crate owns the incremental multi-bundle build pipeline: a set of
//! independent [`BundlerContext`]s (application code, global stylesheet
//! groups, global script groups, optionally server code) is driven through
//! repeatable build/rebuild cycles, their outputs merged into a single
//! [`ExecutionResult`], and a fixed sequence of post-processing stages
//! (index HTML generation, asset collection, license extraction,
//! service-worker manifesting, budget checks, i18n inlining) appends to
//! that result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trellis_bundler::{execute_build, BuildOptions, FlatBundler};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut options = BuildOptions::new("/project", ["src/main.js"]);
//! options.global_styles = vec!["src/styles.css".into()];
//!
//! let result = execute_build(&options, Arc::new(FlatBundler::new()), None).await?;
//! for file in &result.output_files {
//!     println!("{} ({} bytes)", file.path, file.contents.len());
//! }
//! # Ok(()) }
//! ```
//!
//! Watch-mode callers thread [`ExecutionResult::rebuild_state`] back into
//! the next `execute_build` invocation so unchanged compilation units
//! reuse their incremental caches.

pub mod assets;
pub mod budgets;
pub mod bundle;
pub mod commonjs;
pub mod context;
pub mod diagnostics;
pub mod execute;
pub mod execution_result;
pub mod flat;
pub mod i18n;
pub mod index_html;
pub mod license;
pub mod metafile;
pub mod output;
pub mod prerender;
pub mod service_worker;
pub mod stylesheets;
pub mod target;
pub mod transfer_size;

pub use assets::{collect_assets, AssetFile, AssetPattern};
pub use budgets::{check_budgets, Budget, BudgetType};
pub use bundle::{Bundle, BundleOutcome, BundleSpec, SourceFileCache, UnitKind};
pub use context::{BundlerContext, BundlingResult, InitialClassifier};
pub use diagnostics::{Diagnostic, Severity};
pub use execute::{execute_build, BuildOptions, IndexHtmlOptions, OptimizationOptions, PrerenderConfig};
pub use execution_result::{ExecutionResult, RebuildState};
pub use flat::FlatBundler;
pub use i18n::{I18nOptions, LocaleDescription};
pub use index_html::{IndexHtmlGenerator, IndexHtmlResult};
pub use metafile::{Metafile, MetafileInput, MetafileOutput, ModuleFormat};
pub use output::{InitialFile, InitialFileKind, OutputFile, OutputFileType};
pub use prerender::{prerender_routes, PrerenderOptions, ShellRenderer};
pub use service_worker::ServiceWorkerOptions;
pub use stylesheets::{rewrite_css_urls, UrlRewriteOptions};
pub use target::{resolve_feature_set, FeatureSet, TargetPlatform};
pub use transfer_size::estimate_transfer_size;

/// Error types for trellis-bundler operations.
///
/// Only programmer and environment faults surface here; compile and
/// bundle diagnostics travel as [`Diagnostic`] values inside result
/// structs and are never raised as errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid build configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pre-rendering was requested but index HTML generation is not
    /// configured, so no document template exists to render into.
    #[error("Pre-rendering requires index HTML generation to be configured")]
    PrerenderRequiresIndex,

    /// Service-worker manifest generation failed. Fatal for the current
    /// build cycle.
    #[error("Service worker manifest generation failed: {0}")]
    ServiceWorker(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoContext {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for trellis-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::PrerenderRequiresIndex => "PRERENDER_REQUIRES_INDEX",
            Error::ServiceWorker(_) => "SERVICE_WORKER_FAILED",
            Error::Io(_) | Error::IoContext { .. } => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(msg) => Some(Box::new(format!(
                "Check the build configuration.\nError: {}",
                msg
            ))),
            Error::PrerenderRequiresIndex => Some(Box::new(
                "Add an `index` section to the configuration or disable pre-rendering."
                    .to_string(),
            )),
            Error::ServiceWorker(_) => Some(Box::new(
                "Verify the service worker configuration file exists and is valid JSON."
                    .to_string(),
            )),
            _ => None,
        }
    }
}
