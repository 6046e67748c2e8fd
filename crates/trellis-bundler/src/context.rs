//! Bundling contexts and the multi-context orchestrator.
//!
//! A [`BundlerContext`] wraps exactly one compilation unit and its
//! private incremental cache. [`BundlerContext::bundle_all`] drives an
//! ordered set of contexts through one build cycle: concurrent fan-out,
//! then a single-threaded, order-preserving merge of their outputs.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::task::JoinSet;

use crate::bundle::{Bundle, BundleOutcome, BundleSpec, SourceFileCache, UnitCache};
use crate::diagnostics::Diagnostic;
use crate::metafile::Metafile;
use crate::output::{InitialFile, OutputFile};

/// Decides whether a chunk produced by a context belongs to the
/// application's initial load.
#[derive(Debug, Clone)]
pub enum InitialClassifier {
    /// Every chunk of this unit is initial (or none is). Used for global
    /// style/script groups, which are built twice with independent
    /// classifiers so their caches stay separate.
    All(bool),
    /// Entry-driven chunks are initial, lazy chunks are not. Used for
    /// application code.
    EntryChunks,
}

impl InitialClassifier {
    /// Whether a chunk the bundler marked as entry-driven is initial.
    pub fn is_initial(&self, entry_driven: bool) -> bool {
        match self {
            InitialClassifier::All(initial) => *initial,
            InitialClassifier::EntryChunks => entry_driven,
        }
    }
}

/// One compilation unit: an immutable build specification plus mutable
/// incremental cache state.
///
/// Created once per builder invocation and reused across watch-mode
/// rebuilds by threading it through [`crate::RebuildState`]. The cache is
/// replaced wholesale after each successful build, never partially
/// mutated.
pub struct BundlerContext {
    spec: BundleSpec,
    /// Whether incremental state should be retained between calls.
    incremental: bool,
    classifier: InitialClassifier,
    bundler: Arc<dyn Bundle>,
    sources: Arc<SourceFileCache>,
    cache: Mutex<Option<UnitCache>>,
}

impl BundlerContext {
    pub fn new(
        spec: BundleSpec,
        incremental: bool,
        classifier: InitialClassifier,
        bundler: Arc<dyn Bundle>,
        sources: Arc<SourceFileCache>,
    ) -> Self {
        Self {
            spec,
            incremental,
            classifier,
            bundler,
            sources,
            cache: Mutex::new(None),
        }
    }

    pub fn spec(&self) -> &BundleSpec {
        &self.spec
    }

    pub fn classifier(&self) -> &InitialClassifier {
        &self.classifier
    }

    /// Produce this unit's output file set, reusing prior incremental
    /// state where available.
    ///
    /// Never returns `Err` for compile diagnostics; those are carried in
    /// the outcome. Safe to call repeatedly on the same instance.
    pub async fn bundle(&self) -> crate::Result<BundleOutcome> {
        let prior = if self.incremental {
            self.cache.lock().clone()
        } else {
            None
        };

        let mut outcome = self
            .bundler
            .bundle(&self.spec, &self.sources, prior.as_ref())
            .await?;

        // Apply this context's initial classification to the candidate
        // set reported by the bundler.
        match self.classifier {
            InitialClassifier::All(true) | InitialClassifier::EntryChunks => {}
            InitialClassifier::All(false) => outcome.initial_files.clear(),
        }

        if self.incremental && !outcome.has_errors() {
            *self.cache.lock() = outcome.cache.take();
        } else {
            outcome.cache = None;
        }

        Ok(outcome)
    }

    /// Run every context for one build cycle and merge the results.
    ///
    /// Contexts are invoked concurrently and share no mutable state; the
    /// merge is a single-threaded, order-preserving concatenation after
    /// all contexts resolve. Output files for the same path follow
    /// last-context-wins replacement; metafile chunks and initial-file
    /// maps must be disjoint and report configuration-bug diagnostics
    /// otherwise.
    pub async fn bundle_all(
        contexts: &[Arc<BundlerContext>],
    ) -> crate::Result<BundlingResult> {
        let mut tasks = JoinSet::new();
        for (index, context) in contexts.iter().enumerate() {
            let context = Arc::clone(context);
            tasks.spawn(async move { (index, context.bundle().await) });
        }

        let mut outcomes: Vec<Option<BundleOutcome>> = (0..contexts.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| {
                crate::Error::InvalidConfig(format!("bundling task panicked: {}", e))
            })?;
            outcomes[index] = Some(outcome?);
        }

        // Fan-in: merge in declaration order for deterministic output.
        let mut result = BundlingResult::default();
        for outcome in outcomes.into_iter().flatten() {
            result.errors.extend(outcome.errors);
            result.warnings.extend(outcome.warnings);
            result.output_files.extend(outcome.output_files);
            result
                .errors
                .extend(result.metafile.merge(outcome.metafile));

            for (chunk, initial) in outcome.initial_files {
                if result.initial_files.contains_key(&chunk) {
                    result.errors.push(Diagnostic::error(format!(
                        "Initial chunk '{}' claimed by multiple bundling contexts",
                        chunk
                    )));
                    continue;
                }
                result.initial_files.insert(chunk, initial);
            }
        }

        Ok(result)
    }
}

impl std::fmt::Debug for BundlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundlerContext")
            .field("unit", &self.spec.unit_name)
            .field("incremental", &self.incremental)
            .finish_non_exhaustive()
    }
}

/// Merged result of one orchestrated build cycle.
#[derive(Debug, Clone, Default)]
pub struct BundlingResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Concatenated in context order; consumers dedupe by path keeping
    /// the last writer.
    pub output_files: Vec<OutputFile>,
    pub metafile: Metafile,
    pub initial_files: FxHashMap<String, InitialFile>,
}

impl BundlingResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
