//! File system watcher with debouncing for development mode.
//!
//! Watches the project directory and filters changes to relevant files,
//! ignoring node_modules, the output directory, and other configured
//! patterns.

use crate::error::{CliError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// File watcher with debouncing and filtering.
///
/// Watches a directory recursively and sends change events through a
/// channel. The debounce window is tracked per path so a rapid editor
/// save burst produces one rebuild.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher.
    ///
    /// # Arguments
    ///
    /// * `root` - Root directory to watch recursively
    /// * `ignore_patterns` - Path fragments to ignore
    /// * `debounce_ms` - Debounce delay in milliseconds
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created or the
    /// directory doesn't exist.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(100);

        let debounce_duration = Duration::from_millis(debounce_ms);
        let mut last_events: FxHashMap<PathBuf, Instant> = FxHashMap::default();
        let root_clone = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                for path in &event.paths {
                    if Self::should_ignore(path, &root_clone, &ignore_patterns) {
                        continue;
                    }

                    // Per-path debounce window
                    let now = Instant::now();
                    if let Some(last) = last_events.get(path) {
                        if now.duration_since(*last) < debounce_duration {
                            continue;
                        }
                    }
                    last_events.insert(path.clone(), now);

                    let change = match event.kind {
                        notify::EventKind::Create(_) => FileChange::Created(path.clone()),
                        notify::EventKind::Modify(_) => FileChange::Modified(path.clone()),
                        notify::EventKind::Remove(_) => FileChange::Removed(path.clone()),
                        _ => continue,
                    };

                    let _ = tx.blocking_send(change);
                }
            }
        })
        .map_err(CliError::Watch)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(CliError::Watch)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    ///
    /// Paths outside the watched root, hidden files, and anything under
    /// a configured ignore fragment are filtered out.
    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        if !path.starts_with(root) {
            return true;
        }

        let rel_path = match path.strip_prefix(root) {
            Ok(p) => p,
            Err(_) => return true,
        };

        let path_str = rel_path.to_string_lossy();

        for pattern in ignore_patterns {
            if pattern.starts_with('*') {
                // Extension pattern like "*.log"
                let ext = pattern.trim_start_matches('*');
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if path_str.starts_with(pattern.as_str())
                || path_str.contains(&format!("/{}", pattern))
            {
                // Directory pattern like "node_modules"
                return true;
            }
        }

        // Hidden files and directories
        for component in rel_path.components() {
            if let Some(name) = component.as_os_str().to_str() {
                if name.starts_with('.') && name != "." && name != ".." {
                    return true;
                }
            }
        }

        false
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_node_modules() {
        let root = PathBuf::from("/project");
        let patterns = vec!["node_modules".to_string()];

        let path = PathBuf::from("/project/node_modules/package/index.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/src/index.js");
        assert!(!FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn ignores_output_directory() {
        let root = PathBuf::from("/project");
        let patterns = vec!["dist".to_string()];

        let path = PathBuf::from("/project/dist/main.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn ignores_extension_patterns() {
        let root = PathBuf::from("/project");
        let patterns = vec!["*.log".to_string()];

        let path = PathBuf::from("/project/debug.log");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/src/index.js");
        assert!(!FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn ignores_hidden_files() {
        let root = PathBuf::from("/project");
        let patterns = vec![];

        let path = PathBuf::from("/project/.git/config");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));

        let path = PathBuf::from("/project/src/.hidden/file.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn ignores_paths_outside_root() {
        let root = PathBuf::from("/project");
        let patterns = vec![];

        let path = PathBuf::from("/other/file.js");
        assert!(FileWatcher::should_ignore(&path, &root, &patterns));
    }

    #[test]
    fn file_change_exposes_path() {
        let path = PathBuf::from("/project/src/index.js");

        let change = FileChange::Modified(path.clone());
        assert_eq!(change.path(), path.as_path());

        let change = FileChange::Removed(path.clone());
        assert_eq!(change.path(), path.as_path());
    }
}
