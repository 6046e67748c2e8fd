//! Build driver.
//!
//! [`execute_build`] runs one full build cycle: bundling fan-out/fan-in
//! through [`BundlerContext::bundle_all`], then the post-processing
//! stages in a fixed dependency order. The order is load-bearing: each
//! stage consumes state only a predecessor produces (the index document
//! needs the final initial-chunk list, the service-worker manifest
//! hashes the index, locale inlining rewrites finished files).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rustc_hash::FxHashMap;
use tracing::{debug, error, info, warn};

use crate::assets::{collect_assets, AssetPattern};
use crate::budgets::{check_budgets, Budget};
use crate::bundle::{Bundle, BundleSpec, SourceFileCache, UnitKind};
use crate::commonjs::check_commonjs_modules;
use crate::context::{BundlerContext, InitialClassifier};
use crate::diagnostics::Diagnostic;
use crate::execution_result::{ExecutionResult, RebuildState};
use crate::i18n::{inline_locales, I18nOptions};
use crate::index_html::IndexHtmlGenerator;
use crate::license::extract_licenses;
use crate::output::{OutputFile, OutputFileType};
use crate::prerender::{prerender_routes, PrerenderOptions, ShellRenderer};
use crate::service_worker::{augment_service_worker, ServiceWorkerOptions};
use crate::stylesheets::UrlRewriteOptions;
use crate::target::{resolve_feature_set, TargetPlatform};
use crate::transfer_size::estimate_transfer_size;

/// Entry document configuration.
#[derive(Debug, Clone)]
pub struct IndexHtmlOptions {
    /// Template path, relative to the workspace root.
    pub input: String,
    /// Output path of the generated document.
    pub output: String,
    pub subresource_integrity: bool,
    pub cross_origin: Option<String>,
}

impl Default for IndexHtmlOptions {
    fn default() -> Self {
        Self {
            input: "src/index.html".into(),
            output: "index.html".into(),
            subresource_integrity: false,
            cross_origin: None,
        }
    }
}

/// Which optimizations are enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizationOptions {
    pub scripts: bool,
    pub styles: bool,
}

impl OptimizationOptions {
    pub fn all() -> Self {
        Self {
            scripts: true,
            styles: true,
        }
    }

    pub fn any(&self) -> bool {
        self.scripts || self.styles
    }
}

/// Pre-rendering configuration plus the renderer collaborator.
#[derive(Clone)]
pub struct PrerenderConfig {
    pub options: PrerenderOptions,
    pub renderer: Arc<dyn ShellRenderer>,
}

impl std::fmt::Debug for PrerenderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrerenderConfig")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Complete configuration for one builder invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub workspace_root: PathBuf,
    /// Browser entry points, relative to the workspace root.
    pub entry_points: Vec<String>,
    /// Global stylesheet groups injected into the index document.
    pub global_styles: Vec<String>,
    /// Global stylesheet groups bundled but not injected; emitted as
    /// lazy chunks the application loads on demand.
    pub lazy_global_styles: Vec<String>,
    /// Global script groups injected into the index document.
    pub global_scripts: Vec<String>,
    /// Global script groups bundled but not injected.
    pub lazy_global_scripts: Vec<String>,
    pub server_entry: Option<String>,
    /// Browserslist-style strings, e.g. `chrome 90`.
    pub supported_browsers: Vec<String>,
    pub external: Vec<String>,
    pub sourcemap: bool,
    pub optimization: OptimizationOptions,
    pub output_hashing: bool,
    pub base_href: Option<String>,
    pub deploy_url: Option<String>,
    pub index: Option<IndexHtmlOptions>,
    pub prerender: Option<PrerenderConfig>,
    pub assets: Vec<AssetPattern>,
    pub extract_licenses: bool,
    pub service_worker: Option<ServiceWorkerOptions>,
    pub budgets: Vec<Budget>,
    pub allowed_commonjs_dependencies: Vec<String>,
    pub i18n: Option<I18nOptions>,
    /// Emit the dependency graph as `stats.json`.
    pub stats_json: bool,
    /// Retain incremental state in the returned result.
    pub watch: bool,
}

impl BuildOptions {
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        entry_points: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            entry_points: entry_points.into_iter().map(Into::into).collect(),
            global_styles: Vec::new(),
            lazy_global_styles: Vec::new(),
            global_scripts: Vec::new(),
            lazy_global_scripts: Vec::new(),
            server_entry: None,
            supported_browsers: Vec::new(),
            external: Vec::new(),
            sourcemap: false,
            optimization: OptimizationOptions::default(),
            output_hashing: false,
            base_href: None,
            deploy_url: None,
            index: None,
            prerender: None,
            assets: Vec::new(),
            extract_licenses: false,
            service_worker: None,
            budgets: Vec::new(),
            allowed_commonjs_dependencies: Vec::new(),
            i18n: None,
            stats_json: false,
            watch: false,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        if self.entry_points.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "at least one entry point is required".into(),
            ));
        }
        if self.prerender.is_some() && self.index.is_none() {
            return Err(crate::Error::PrerenderRequiresIndex);
        }
        Ok(())
    }

    fn url_rewrite(&self) -> Option<UrlRewriteOptions> {
        if self.base_href.is_none() && self.deploy_url.is_none() {
            return None;
        }
        Some(UrlRewriteOptions {
            base_href: self.base_href.clone().unwrap_or_default(),
            deploy_url: self.deploy_url.clone().unwrap_or_default(),
        })
    }
}

/// Chunk name for an entry file: the file stem, deduplicated within the
/// entry list by appending a counter.
fn chunk_names(entries: &[String]) -> Vec<(String, String)> {
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();
    entries
        .iter()
        .map(|entry| {
            let stem = Path::new(entry)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "main".to_string());
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            let name = if *count == 1 {
                stem
            } else {
                format!("{}-{}", stem, count)
            };
            (name, entry.clone())
        })
        .collect()
}

fn create_contexts(
    options: &BuildOptions,
    bundler: &Arc<dyn Bundle>,
    sources: &Arc<SourceFileCache>,
) -> Vec<Arc<BundlerContext>> {
    let features = resolve_feature_set(&options.supported_browsers);
    let mut contexts = Vec::new();

    let root = &options.workspace_root;
    let app_entries: Vec<(String, PathBuf)> = chunk_names(&options.entry_points)
        .into_iter()
        .map(|(name, entry)| (name, root.join(entry)))
        .collect();
    contexts.push(Arc::new(BundlerContext::new(
        BundleSpec {
            unit_name: "app".into(),
            kind: UnitKind::AppCode,
            workspace_root: root.clone(),
            entry_points: app_entries,
            platform: TargetPlatform::Browser,
            features,
            external: options.external.clone(),
            sourcemap: options.sourcemap,
            optimize: options.optimization.scripts,
            output_hashing: options.output_hashing,
            url_rewrite: None,
        },
        options.watch,
        InitialClassifier::EntryChunks,
        Arc::clone(bundler),
        Arc::clone(sources),
    )));

    // Each global group gets one context per injection mode: injected
    // entries are initial, non-injected ones become lazy chunks.
    let style_groups = [
        (&options.global_styles, "global-styles", true),
        (&options.lazy_global_styles, "lazy-global-styles", false),
    ];
    for (group, unit_name, injected) in style_groups {
        if group.is_empty() {
            continue;
        }
        let entries: Vec<(String, PathBuf)> = chunk_names(group)
            .into_iter()
            .map(|(name, entry)| (name, root.join(entry)))
            .collect();
        contexts.push(Arc::new(BundlerContext::new(
            BundleSpec {
                unit_name: unit_name.into(),
                kind: UnitKind::GlobalStyles,
                workspace_root: root.clone(),
                entry_points: entries,
                platform: TargetPlatform::Browser,
                features,
                external: Vec::new(),
                sourcemap: options.sourcemap,
                optimize: options.optimization.styles,
                output_hashing: options.output_hashing,
                url_rewrite: options.url_rewrite(),
            },
            options.watch,
            InitialClassifier::All(injected),
            Arc::clone(bundler),
            Arc::clone(sources),
        )));
    }

    let script_groups = [
        (&options.global_scripts, "global-scripts", true),
        (&options.lazy_global_scripts, "lazy-global-scripts", false),
    ];
    for (group, unit_name, injected) in script_groups {
        if group.is_empty() {
            continue;
        }
        let entries: Vec<(String, PathBuf)> = chunk_names(group)
            .into_iter()
            .map(|(name, entry)| (name, root.join(entry)))
            .collect();
        contexts.push(Arc::new(BundlerContext::new(
            BundleSpec {
                unit_name: unit_name.into(),
                kind: UnitKind::GlobalScripts,
                workspace_root: root.clone(),
                entry_points: entries,
                platform: TargetPlatform::Browser,
                features,
                external: Vec::new(),
                sourcemap: options.sourcemap,
                optimize: options.optimization.scripts,
                output_hashing: options.output_hashing,
                url_rewrite: None,
            },
            options.watch,
            InitialClassifier::All(injected),
            Arc::clone(bundler),
            Arc::clone(sources),
        )));
    }

    if let Some(server_entry) = &options.server_entry {
        contexts.push(Arc::new(BundlerContext::new(
            BundleSpec {
                unit_name: "server".into(),
                kind: UnitKind::ServerCode,
                workspace_root: root.clone(),
                entry_points: vec![("server".into(), root.join(server_entry))],
                platform: TargetPlatform::Server,
                features,
                external: options.external.clone(),
                sourcemap: options.sourcemap,
                optimize: options.optimization.scripts,
                output_hashing: false,
                url_rewrite: None,
            },
            options.watch,
            InitialClassifier::All(false),
            Arc::clone(bundler),
            Arc::clone(sources),
        )));
    }

    contexts
}

fn report_diagnostics(errors: &[Diagnostic], warnings: &[Diagnostic]) {
    for warning in warnings {
        warn!("{}", warning);
    }
    for err in errors {
        error!("{}", err);
    }
}

/// Run one full build cycle.
///
/// Returns `Err` only for programmer/configuration faults and
/// environment failures; compile and bundle problems land in the
/// result's diagnostics. In watch mode, pass the previous result's
/// [`RebuildState`] back in to reuse incremental caches.
///
/// # Errors
///
/// [`crate::Error::InvalidConfig`] for an empty entry list,
/// [`crate::Error::PrerenderRequiresIndex`] when pre-rendering is
/// requested without index generation, and I/O errors from template or
/// asset reading.
pub async fn execute_build(
    options: &BuildOptions,
    bundler: Arc<dyn Bundle>,
    rebuild_state: Option<RebuildState>,
) -> crate::Result<ExecutionResult> {
    options.validate()?;
    let started = Instant::now();

    // Contexts and the source cache survive across watch cycles.
    let (contexts, sources) = match rebuild_state {
        Some(state) => {
            debug!(contexts = state.contexts.len(), "reusing incremental state");
            (state.contexts, state.source_cache)
        }
        None => {
            let sources = Arc::new(SourceFileCache::new());
            (create_contexts(options, &bundler, &sources), sources)
        }
    };

    let bundling = BundlerContext::bundle_all(&contexts).await?;
    report_diagnostics(&bundling.errors, &bundling.warnings);

    let mut result = ExecutionResult::new();
    result.errors = bundling.errors;
    result.warnings = bundling.warnings;
    result.output_files = bundling.output_files;
    result.metafile = bundling.metafile;
    result.initial_files = bundling.initial_files;

    let keep_state = |mut result: ExecutionResult| {
        if options.watch {
            result.rebuild_state = Some(RebuildState {
                contexts: contexts.clone(),
                source_cache: Arc::clone(&sources),
            });
        }
        result
    };

    // Bundling errors are terminal for this cycle; watch mode loops.
    if result.has_errors() {
        return Ok(keep_state(result));
    }

    if options.optimization.scripts {
        let commonjs_warnings =
            check_commonjs_modules(&result.metafile, &options.allowed_commonjs_dependencies);
        report_diagnostics(&[], &commonjs_warnings);
        result.warnings.extend(commonjs_warnings);
    }

    // Index generation must precede the service-worker stage; the
    // manifest hashes the generated document.
    let mut prerender_document = None;
    if let Some(index) = &options.index {
        let template_path = options.workspace_root.join(&index.input);
        let template =
            std::fs::read_to_string(&template_path).map_err(|e| crate::Error::IoContext {
                message: format!("cannot read index template '{}'", template_path.display()),
                source: e,
            })?;

        let contents: FxHashMap<String, Vec<u8>> = result
            .final_output_files()
            .iter()
            .map(|f| (f.path.clone(), f.contents.clone()))
            .collect();
        let generated = IndexHtmlGenerator {
            base_href: options.base_href.clone(),
            subresource_integrity: index.subresource_integrity,
            cross_origin: index.cross_origin.clone(),
        }
        .generate(&template, &result.initial_files, &contents);

        report_diagnostics(&generated.errors, &generated.warnings);
        result.warnings.extend(generated.warnings);
        result.errors.extend(generated.errors);
        prerender_document = Some(generated.content_without_critical_css);
        result.index_path = Some(index.output.clone());
        result.add_output_file(
            index.output.clone(),
            generated.content.into_bytes(),
            OutputFileType::Browser,
        );
    }

    if let Some(prerender) = &options.prerender {
        // validate() already rejected prerendering without an index.
        let document = prerender_document
            .as_deref()
            .ok_or(crate::Error::PrerenderRequiresIndex)?;
        let (rendered, diagnostics) = prerender_routes(
            &prerender.options,
            Arc::clone(&prerender.renderer),
            document,
        )
        .await;
        report_diagnostics(&diagnostics, &[]);
        result.errors.extend(diagnostics);
        result.output_files.extend(rendered);
    }

    let asset_files = collect_assets(&options.workspace_root, &options.assets)?;
    for asset in &asset_files {
        result
            .assets
            .push((asset.source.clone(), asset.destination.clone()));
    }

    if options.extract_licenses {
        if let Some(text) = extract_licenses(&result.metafile, &options.workspace_root) {
            result.add_output_file(
                "3rdpartylicenses.txt",
                text.into_bytes(),
                OutputFileType::Root,
            );
        }
    }

    if let Some(service_worker) = &options.service_worker {
        // The manifest must also cover copied assets.
        let mut asset_outputs = Vec::with_capacity(asset_files.len());
        for asset in &asset_files {
            let contents = std::fs::read(&asset.source).map_err(|e| crate::Error::IoContext {
                message: format!("cannot read asset '{}'", asset.source.display()),
                source: e,
            })?;
            asset_outputs.push(OutputFile::new(
                asset.destination.clone(),
                contents,
                OutputFileType::Browser,
            ));
        }

        let mut manifest_inputs = result.final_output_files();
        manifest_inputs.extend(asset_outputs.iter());
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        match augment_service_worker(
            &options.workspace_root,
            service_worker,
            &manifest_inputs,
            timestamp,
        ) {
            Ok(manifest) => result.output_files.push(manifest),
            Err(e) => {
                // Stage-fatal: a stale manifest would pin clients to
                // outdated caches. Later stages are skipped.
                error!("{}", e);
                result.errors.push(Diagnostic::error(e.to_string()));
                return Ok(keep_state(result));
            }
        }
    }

    if !options.budgets.is_empty() {
        let finals = result.final_output_files();
        let budget_diagnostics = check_budgets(&options.budgets, &finals, &result.initial_files);
        drop(finals);
        for diagnostic in &budget_diagnostics {
            if diagnostic.is_error() {
                error!("{}", diagnostic);
            } else {
                warn!("{}", diagnostic);
            }
        }
        // Advisory either way: violations are logged above (at error
        // level when the budget asks for it) but never land in
        // `result.errors`, so they cannot change the build outcome.
        result.warnings.extend(budget_diagnostics);
    }

    if options.optimization.any() {
        for file in result.final_output_files() {
            if file.file_type == OutputFileType::Browser && !file.path.ends_with(".map") {
                if let Ok(estimate) = estimate_transfer_size(file) {
                    debug!(path = %file.path, raw = file.size(), estimated = estimate, "transfer size");
                }
            }
        }
    }

    info!(
        files = result.final_output_files().len(),
        bytes = result.browser_bytes(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "build cycle complete"
    );

    // Locale inlining rewrites finished artifacts, so it runs after
    // every other content-producing stage.
    if let Some(i18n) = &options.i18n {
        let (localized, warnings) = inline_locales(i18n, &result.final_output_files())?;
        report_diagnostics(&[], &warnings);
        result.warnings.extend(warnings);
        result.output_files = localized;
    }

    if options.stats_json {
        let stats = result.metafile.to_stats_json()?;
        result.add_output_file("stats.json", stats.into_bytes(), OutputFileType::Root);
    }

    Ok(keep_state(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_names_deduplicate_colliding_stems() {
        let names = chunk_names(&[
            "src/main.ts".into(),
            "src/other/main.ts".into(),
            "src/styles.css".into(),
        ]);
        assert_eq!(names[0].0, "main");
        assert_eq!(names[1].0, "main-2");
        assert_eq!(names[2].0, "styles");
    }

    #[test]
    fn prerender_without_index_is_a_typed_error() {
        struct NoopRenderer;

        #[async_trait::async_trait]
        impl ShellRenderer for NoopRenderer {
            async fn render(&self, _: &str, document: &str) -> Result<String, String> {
                Ok(document.to_string())
            }
        }

        let mut options = BuildOptions::new("/tmp", ["src/main.js"]);
        options.prerender = Some(PrerenderConfig {
            options: PrerenderOptions::default(),
            renderer: Arc::new(NoopRenderer),
        });

        let err = options.validate().unwrap_err();
        assert!(matches!(err, crate::Error::PrerenderRequiresIndex));
    }

    #[test]
    fn empty_entry_list_is_rejected() {
        let options = BuildOptions::new("/tmp", Vec::<String>::new());
        assert!(matches!(
            options.validate().unwrap_err(),
            crate::Error::InvalidConfig(_)
        ));
    }
}
