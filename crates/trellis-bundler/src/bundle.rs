//! Bundler collaborator contract.
//!
//! The low-level bundler/minifier is an external tool invoked as a black
//! box. This module defines the contract a bundler must satisfy to drive
//! one compilation unit: given a [`BundleSpec`] and optional prior
//! incremental state, produce output files, a metafile fragment, and
//! diagnostics. Compile errors are returned in the outcome, never as
//! `Err`; `Err` is reserved for environment faults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

use crate::diagnostics::Diagnostic;
use crate::metafile::Metafile;
use crate::output::{InitialFile, OutputFile};
use crate::stylesheets::UrlRewriteOptions;
use crate::target::{FeatureSet, TargetPlatform};

/// What a compilation unit contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Application code with lazy-route splitting.
    AppCode,
    /// A global stylesheet group.
    GlobalStyles,
    /// A global script group (concatenated, no module semantics).
    GlobalScripts,
    /// Server-rendering code, not served to browsers.
    ServerCode,
}

/// Immutable build specification for one compilation unit.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    /// Unit identity, used for cache keying and diagnostics.
    pub unit_name: String,
    pub kind: UnitKind,
    pub workspace_root: PathBuf,
    /// `(chunk name, entry source path)` pairs, in declaration order.
    pub entry_points: Vec<(String, PathBuf)>,
    pub platform: TargetPlatform,
    pub features: FeatureSet,
    /// Import specifiers left unresolved in the output.
    pub external: Vec<String>,
    pub sourcemap: bool,
    pub optimize: bool,
    /// Append a content hash to output file names.
    pub output_hashing: bool,
    /// URL rewriting applied to stylesheet declarations, when configured.
    pub url_rewrite: Option<UrlRewriteOptions>,
}

/// Result of bundling one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct BundleOutcome {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub output_files: Vec<OutputFile>,
    pub metafile: Metafile,
    /// Chunk name to initial-file record, for chunks that belong to the
    /// application's initial load.
    pub initial_files: FxHashMap<String, InitialFile>,
    /// Incremental state handed back to the owning context for the next
    /// cycle. `None` when the bundler does not support reuse.
    pub cache: Option<UnitCache>,
}

impl BundleOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Per-unit incremental cache: input content hashes plus the outputs
/// they produced. Replaced wholesale on each successful build, never
/// partially mutated.
#[derive(Debug, Clone, Default)]
pub struct UnitCache {
    pub file_hashes: FxHashMap<PathBuf, [u8; 32]>,
    pub output_files: Vec<OutputFile>,
    pub metafile: Metafile,
    pub initial_files: FxHashMap<String, InitialFile>,
}

impl UnitCache {
    /// True when every recorded input still hashes to the same content.
    pub fn is_fresh(&self, sources: &SourceFileCache) -> bool {
        if self.file_hashes.is_empty() {
            return false;
        }
        self.file_hashes.iter().all(|(path, hash)| {
            sources
                .get_or_read(path)
                .map(|contents| content_hash(&contents) == *hash)
                .unwrap_or(false)
        })
    }
}

/// Contract for the underlying bundler tool.
#[async_trait]
pub trait Bundle: Send + Sync {
    /// Bundle one compilation unit, optionally reusing prior state.
    ///
    /// Must be safe to call repeatedly with the same spec: a second call
    /// reflects only the current state of inputs.
    async fn bundle(
        &self,
        spec: &BundleSpec,
        sources: &SourceFileCache,
        cache: Option<&UnitCache>,
    ) -> crate::Result<BundleOutcome>;
}

/// Cross-build source content cache shared by all bundling contexts.
///
/// One instance lives for a builder invocation (or the parent watch-mode
/// session); the watcher invalidates changed paths between cycles so
/// rebuilds observe fresh content without re-reading unchanged files.
#[derive(Debug, Default)]
pub struct SourceFileCache {
    files: Mutex<FxHashMap<PathBuf, Arc<Vec<u8>>>>,
}

impl SourceFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file through the cache.
    pub fn get_or_read(&self, path: &Path) -> std::io::Result<Arc<Vec<u8>>> {
        if let Some(contents) = self.files.lock().get(path) {
            return Ok(Arc::clone(contents));
        }
        let contents = Arc::new(std::fs::read(path)?);
        self.files
            .lock()
            .insert(path.to_path_buf(), Arc::clone(&contents));
        Ok(contents)
    }

    /// Drop the cached entry for a changed path.
    pub fn invalidate(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    pub fn clear(&self) {
        self.files.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }
}

/// SHA-256 of file contents, used for incremental change detection.
pub fn content_hash(contents: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_cache_reads_once_and_invalidate_rereads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first").unwrap();
        let cache = SourceFileCache::new();

        let initial = cache.get_or_read(file.path()).unwrap();
        assert_eq!(initial.as_slice(), b"first");

        // Rewrite on disk; cached value is returned until invalidated.
        std::fs::write(file.path(), b"second").unwrap();
        let cached = cache.get_or_read(file.path()).unwrap();
        assert_eq!(cached.as_slice(), b"first");

        cache.invalidate(file.path());
        let fresh = cache.get_or_read(file.path()).unwrap();
        assert_eq!(fresh.as_slice(), b"second");
    }

    #[test]
    fn unit_cache_freshness_tracks_content_hashes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "body").unwrap();
        let sources = SourceFileCache::new();

        let mut cache = UnitCache::default();
        cache
            .file_hashes
            .insert(file.path().to_path_buf(), content_hash(b"body"));
        assert!(cache.is_fresh(&sources));

        sources.invalidate(file.path());
        std::fs::write(file.path(), b"changed").unwrap();
        assert!(!cache.is_fresh(&sources));
    }

    #[test]
    fn empty_unit_cache_is_never_fresh() {
        let sources = SourceFileCache::new();
        assert!(!UnitCache::default().is_fresh(&sources));
    }
}
