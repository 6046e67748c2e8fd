//! Development server module.
//!
//! Provides the `trellis dev` runtime:
//! - Live reload via Server-Sent Events
//! - In-memory serving of build output
//! - File watching with debouncing
//! - Rebuild-to-rebuild output diffing

pub mod diff;
pub mod server;
pub mod state;
pub mod watcher;

// Re-exports
pub use diff::{OutputDiffer, OutputFileRecord};
pub use server::DevServer;
pub use state::{BuildStatus, BundleCache, DevServerState, SharedState};
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Events in the dev server lifecycle, serialized to SSE clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DevEvent {
    /// Build started
    BuildStarted,

    /// Build completed successfully
    BuildCompleted { duration_ms: u64 },

    /// Build failed with error
    BuildFailed { error: String },

    /// Served content changed; clients should reload
    #[serde(rename = "full-reload")]
    FullReload { path: String },
}

impl DevEvent {
    /// The reload event sent after every successful rebuild that
    /// changed served content.
    pub fn full_reload() -> Self {
        DevEvent::FullReload {
            path: "*".to_string(),
        }
    }
}
