//! Shared state for the development server.
//!
//! Provides thread-safe access to served content, client connections,
//! and build status using parking_lot RwLock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No build has been performed yet
    NotStarted,
    /// Build is currently in progress
    InProgress { started_at: Instant },
    /// Build completed successfully
    Success { duration_ms: u64 },
    /// Build failed with error
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, BuildStatus::InProgress { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Get error message if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// In-memory cache of build output for serving without disk I/O.
///
/// Maps URL paths to their content and MIME type. The whole cache is
/// replaced after each successful rebuild.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    files: HashMap<String, (Vec<u8>, String)>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Insert a file keyed by URL path (e.g. `/main.js`).
    pub fn insert(&mut self, path: String, content: Vec<u8>, content_type: String) {
        self.files.insert(path, (content, content_type));
    }

    pub fn get(&self, path: &str) -> Option<&(Vec<u8>, String)> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Client connection tracker for Server-Sent Events.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, tokio::sync::mpsc::Sender<String>>>>;

/// Shared development server state.
///
/// All fields use parking_lot::RwLock; no lock is held across an await
/// point. Writers replace whole values rather than mutating in place.
pub struct DevServerState {
    /// Current build status
    pub status: RwLock<BuildStatus>,

    /// In-memory build output
    pub cache: RwLock<BundleCache>,

    /// Connected SSE clients
    pub clients: ClientRegistry,

    /// Next client ID
    pub next_client_id: RwLock<usize>,

    /// URL path of the index document, usually `/index.html`.
    pub index_path: RwLock<String>,
}

impl DevServerState {
    pub fn new() -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            cache: RwLock::new(BundleCache::new()),
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
            index_path: RwLock::new("/index.html".to_string()),
        }
    }

    pub fn start_build(&self) {
        *self.status.write() = BuildStatus::InProgress {
            started_at: Instant::now(),
        };
    }

    pub fn complete_build(&self, duration_ms: u64) {
        *self.status.write() = BuildStatus::Success { duration_ms };
    }

    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Replace the served content wholesale after a rebuild.
    pub fn update_cache(&self, new_cache: BundleCache) {
        *self.cache.write() = new_cache;
    }

    pub fn get_cached_file(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.cache.read().get(path).cloned()
    }

    pub fn set_index_path(&self, path: String) {
        *self.index_path.write() = path;
    }

    pub fn index_path(&self) -> String {
        self.index_path.read().clone()
    }

    /// Register a new SSE client, returning its id and event receiver.
    pub fn register_client(&self) -> (usize, tokio::sync::mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = tokio::sync::mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Broadcast an event to all connected clients.
    ///
    /// Dead clients (closed receivers) are pruned after the send pass.
    pub async fn broadcast(&self, event: &crate::dev::DevEvent) {
        let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());

        let clients = self.clients.read().clone();
        let mut failed_ids = Vec::new();

        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            }
        }

        for id in failed_ids {
            self.unregister_client(id);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl Default for DevServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_status_transitions() {
        let state = DevServerState::new();
        assert!(matches!(state.get_status(), BuildStatus::NotStarted));

        state.start_build();
        assert!(state.get_status().is_in_progress());

        state.complete_build(150);
        assert!(state.get_status().is_success());

        state.fail_build("boom".to_string());
        assert_eq!(state.get_status().error(), Some("boom"));
    }

    #[test]
    fn cache_replacement_is_wholesale() {
        let state = DevServerState::new();

        let mut cache = BundleCache::new();
        cache.insert(
            "/main.js".to_string(),
            b"export {}".to_vec(),
            "application/javascript".to_string(),
        );
        state.update_cache(cache);
        assert!(state.get_cached_file("/main.js").is_some());

        state.update_cache(BundleCache::new());
        assert!(state.get_cached_file("/main.js").is_none());
    }

    #[tokio::test]
    async fn client_registration_and_pruning() {
        let state = Arc::new(DevServerState::new());

        let (id1, rx1) = state.register_client();
        let (id2, _rx2) = state.register_client();
        assert_eq!(state.client_count(), 2);
        assert_ne!(id1, id2);

        // Dropping a receiver makes the next broadcast prune the client.
        drop(rx1);
        state.broadcast(&crate::dev::DevEvent::full_reload()).await;
        assert_eq!(state.client_count(), 1);
    }
}
