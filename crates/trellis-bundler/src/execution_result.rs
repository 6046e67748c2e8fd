//! Accumulated result of one build execution.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::bundle::SourceFileCache;
use crate::context::BundlerContext;
use crate::diagnostics::Diagnostic;
use crate::metafile::Metafile;
use crate::output::{dedupe_last_wins, InitialFile, OutputFile, OutputFileType};

/// Incremental state threaded between watch-mode build cycles.
///
/// Holds the bundling contexts (with their per-unit caches) and the
/// shared source content cache. Dropping it discards all incremental
/// state; the next cycle is a full build.
pub struct RebuildState {
    pub contexts: Vec<Arc<BundlerContext>>,
    pub source_cache: Arc<SourceFileCache>,
}

impl std::fmt::Debug for RebuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildState")
            .field("contexts", &self.contexts.len())
            .field("cached_sources", &self.source_cache.len())
            .finish()
    }
}

/// Everything one build cycle produced.
///
/// Post-processing stages append to `output_files` rather than mutating
/// earlier entries; consumers apply last-writer-wins deduplication by
/// `(path, type)` when materializing the set.
#[derive(Default)]
pub struct ExecutionResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub output_files: Vec<OutputFile>,
    /// Source files copied verbatim, as `(source, destination)` pairs.
    pub assets: Vec<(std::path::PathBuf, String)>,
    pub metafile: Metafile,
    pub initial_files: FxHashMap<String, InitialFile>,
    /// Output path of the generated index document, when produced.
    pub index_path: Option<String>,
    /// State for the next incremental cycle. `None` outside watch mode
    /// or after a failed build.
    pub rebuild_state: Option<RebuildState>,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append a generated artifact.
    pub fn add_output_file(
        &mut self,
        path: impl Into<String>,
        contents: Vec<u8>,
        file_type: OutputFileType,
    ) {
        self.output_files
            .push(OutputFile::new(path, contents, file_type));
    }

    /// The final artifact set with per-path replacements resolved.
    pub fn final_output_files(&self) -> Vec<&OutputFile> {
        dedupe_last_wins(&self.output_files)
    }

    /// Total byte size of browser-served artifacts.
    pub fn browser_bytes(&self) -> u64 {
        self.final_output_files()
            .iter()
            .filter(|f| f.file_type == OutputFileType::Browser)
            .map(|f| f.size())
            .sum()
    }
}

impl std::fmt::Debug for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionResult")
            .field("errors", &self.errors.len())
            .field("warnings", &self.warnings.len())
            .field("output_files", &self.output_files.len())
            .field("assets", &self.assets.len())
            .field("index_path", &self.index_path)
            .field("incremental", &self.rebuild_state.is_some())
            .finish()
    }
}
