//! Reference bundler implementation.
//!
//! [`FlatBundler`] is a deterministic, dependency-free bundler used by
//! the test suite and by projects that do not need minification beyond
//! whitespace stripping. It resolves relative static imports with a
//! regex-driven graph walk, splits dynamic `import()` targets into lazy
//! chunks, and concatenates module text in dependency-first order. It is
//! not a semantics-preserving JavaScript compiler; it exists to exercise
//! the orchestration layer with realistic multi-chunk output shapes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::bundle::{
    content_hash, Bundle, BundleOutcome, BundleSpec, SourceFileCache, UnitCache, UnitKind,
};
use crate::diagnostics::Diagnostic;
use crate::metafile::{Metafile, MetafileInput, MetafileOutput, ModuleFormat};
use crate::output::{normalize_path, InitialFile, InitialFileKind, OutputFile, OutputFileType};
use crate::stylesheets::rewrite_css_urls;
use crate::target::TargetPlatform;

fn static_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*(?:import|export)\s+(?:[^'"\n;]*?from\s+)?['"]([^'"]+)['"]"#)
            .expect("static import pattern is valid")
    })
}

fn dynamic_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#).expect("dynamic import pattern is valid")
    })
}

fn css_import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?\s*;"#)
            .expect("css import pattern is valid")
    })
}

/// One module discovered during the graph walk.
struct Module {
    /// Workspace-relative path used in metafile entries.
    id: String,
    contents: String,
    bytes: u64,
    imports: Vec<String>,
    format: ModuleFormat,
}

/// Deterministic concatenating bundler.
#[derive(Debug, Default)]
pub struct FlatBundler;

impl FlatBundler {
    pub fn new() -> Self {
        Self
    }

    fn resolve(&self, from_dir: &Path, specifier: &str) -> Option<PathBuf> {
        let base = from_dir.join(specifier);
        if base.is_file() {
            return Some(base);
        }
        for ext in ["ts", "js", "mjs", "css"] {
            let candidate = base.with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for index in ["index.ts", "index.js"] {
            let candidate = base.join(index);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    fn is_relative(specifier: &str) -> bool {
        specifier.starts_with("./") || specifier.starts_with("../")
    }

    fn module_id(workspace_root: &Path, path: &Path) -> String {
        let relative = path.strip_prefix(workspace_root).unwrap_or(path);
        normalize_path(relative.to_string_lossy())
    }

    fn detect_format(path: &Path, contents: &str) -> ModuleFormat {
        if path.extension().is_some_and(|e| e == "css") {
            ModuleFormat::Css
        } else if contents.contains("require(") || contents.contains("module.exports") {
            ModuleFormat::Cjs
        } else {
            ModuleFormat::Esm
        }
    }

    /// Depth-first post-order walk from one entry module.
    ///
    /// Static imports are inlined into the current chunk; dynamic import
    /// targets are recorded in `lazy` for separate chunking. Unresolvable
    /// relative specifiers become error diagnostics, not `Err`.
    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        spec: &BundleSpec,
        sources: &SourceFileCache,
        path: &Path,
        visited: &mut FxHashSet<PathBuf>,
        order: &mut Vec<Module>,
        lazy: &mut BTreeMap<String, PathBuf>,
        hashes: &mut FxHashMap<PathBuf, [u8; 32]>,
        errors: &mut Vec<Diagnostic>,
    ) {
        if !visited.insert(path.to_path_buf()) {
            return;
        }

        let id = Self::module_id(&spec.workspace_root, path);
        let raw = match sources.get_or_read(path) {
            Ok(raw) => raw,
            Err(e) => {
                errors.push(Diagnostic::error(format!("Could not read '{}': {}", id, e)));
                return;
            }
        };
        hashes.insert(path.to_path_buf(), content_hash(&raw));
        let contents = String::from_utf8_lossy(&raw).into_owned();

        let is_css = path.extension().is_some_and(|e| e == "css");
        let specifier_regex = if is_css {
            css_import_regex()
        } else {
            static_import_regex()
        };
        let parent = path.parent().unwrap_or(Path::new("."));

        let mut imports = Vec::new();
        for capture in specifier_regex.captures_iter(&contents) {
            let specifier = &capture[1];
            if spec.external.iter().any(|e| specifier.starts_with(e.as_str())) {
                continue;
            }
            if !Self::is_relative(specifier) && !is_css {
                // Bare specifiers resolve through node_modules.
                if let Some(resolved) = self.resolve(&spec.workspace_root.join("node_modules"), specifier) {
                    imports.push(Self::module_id(&spec.workspace_root, &resolved));
                    self.walk(spec, sources, &resolved, visited, order, lazy, hashes, errors);
                }
                continue;
            }
            match self.resolve(parent, specifier) {
                Some(resolved) => {
                    imports.push(Self::module_id(&spec.workspace_root, &resolved));
                    self.walk(spec, sources, &resolved, visited, order, lazy, hashes, errors);
                }
                None => errors.push(
                    Diagnostic::error(format!("Could not resolve '{}'", specifier))
                        .with_location(id.clone(), 1, 1),
                ),
            }
        }

        if !is_css {
            for capture in dynamic_import_regex().captures_iter(&contents) {
                let specifier = &capture[1];
                if !Self::is_relative(specifier) {
                    continue;
                }
                match self.resolve(parent, specifier) {
                    Some(resolved) => {
                        let stem = resolved
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_else(|| "chunk".to_string());
                        lazy.entry(stem).or_insert(resolved);
                    }
                    None => errors.push(
                        Diagnostic::error(format!(
                            "Could not resolve dynamic import '{}'",
                            specifier
                        ))
                        .with_location(id.clone(), 1, 1),
                    ),
                }
            }
        }

        let format = Self::detect_format(path, &contents);
        order.push(Module {
            id,
            bytes: raw.len() as u64,
            contents,
            imports,
            format,
        });
    }

    /// Strip import/export declarations and comments from chunk text.
    fn render_module(contents: &str, optimize: bool) -> String {
        let mut out = String::with_capacity(contents.len());
        for line in contents.lines() {
            let trimmed = line.trim_start();
            if static_import_regex().is_match(line) && !trimmed.starts_with("export ") {
                continue;
            }
            if optimize && (trimmed.is_empty() || trimmed.starts_with("//")) {
                continue;
            }
            let rendered = trimmed
                .strip_prefix("export default ")
                .or_else(|| trimmed.strip_prefix("export "))
                .unwrap_or(trimmed);
            if optimize {
                out.push_str(rendered);
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
        out
    }

    fn hashed_name(name: &str, ext: &str, contents: &str, hashing: bool) -> String {
        if hashing {
            let digest = content_hash(contents.as_bytes());
            let hex: String = digest[..4].iter().map(|b| format!("{:02x}", b)).collect();
            format!("{}-{}.{}", name, hex, ext)
        } else {
            format!("{}.{}", name, ext)
        }
    }

    /// Assemble one JavaScript chunk from a walked module list.
    #[allow(clippy::too_many_arguments)]
    fn emit_script_chunk(
        &self,
        spec: &BundleSpec,
        chunk_name: &str,
        modules: &[Module],
        entry_id: &str,
        outcome: &mut BundleOutcome,
        file_type: OutputFileType,
        initial: bool,
    ) {
        let mut text = String::new();
        for module in modules {
            text.push_str(&Self::render_module(&module.contents, spec.optimize));
        }

        let file_name = Self::hashed_name(chunk_name, "js", &text, spec.output_hashing);
        let mut inputs = FxHashMap::default();
        for module in modules {
            inputs.insert(module.id.clone(), module.bytes);
        }
        outcome.metafile.outputs.insert(
            file_name.clone(),
            MetafileOutput {
                bytes: text.len() as u64,
                inputs,
                entry_point: Some(entry_id.to_string()),
            },
        );

        if spec.sourcemap {
            let map = serde_json::json!({
                "version": 3,
                "file": file_name,
                "sources": modules.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            });
            outcome.output_files.push(OutputFile::text(
                format!("{}.map", file_name),
                map.to_string(),
                file_type,
            ));
        }

        if initial {
            outcome.initial_files.insert(
                chunk_name.to_string(),
                InitialFile {
                    file: file_name.clone(),
                    name: chunk_name.to_string(),
                    kind: InitialFileKind::Script,
                },
            );
        }

        outcome
            .output_files
            .push(OutputFile::text(file_name, text, file_type));
    }

    fn bundle_scripts(
        &self,
        spec: &BundleSpec,
        sources: &SourceFileCache,
        outcome: &mut BundleOutcome,
        hashes: &mut FxHashMap<PathBuf, [u8; 32]>,
    ) {
        let file_type = match spec.platform {
            TargetPlatform::Browser => OutputFileType::Browser,
            TargetPlatform::Server => OutputFileType::Server,
        };
        let initial = spec.platform == TargetPlatform::Browser;

        // Entry chunks, walked in declaration order.
        let mut lazy = BTreeMap::new();
        for (chunk_name, entry) in &spec.entry_points {
            if !entry.is_file() {
                outcome.errors.push(Diagnostic::error(format!(
                    "Entry point '{}' does not exist",
                    entry.display()
                )));
                continue;
            }
            let mut visited = FxHashSet::default();
            let mut order = Vec::new();
            self.walk(
                spec,
                sources,
                entry,
                &mut visited,
                &mut order,
                &mut lazy,
                hashes,
                &mut outcome.errors,
            );
            let entry_id = Self::module_id(&spec.workspace_root, entry);
            for module in &order {
                outcome.metafile.inputs.entry(module.id.clone()).or_insert(MetafileInput {
                    bytes: module.bytes,
                    imports: module.imports.clone(),
                    format: Some(module.format),
                });
            }
            self.emit_script_chunk(spec, chunk_name, &order, &entry_id, outcome, file_type, initial);
        }

        // Lazy chunks. BTreeMap iteration keeps naming stable across runs.
        let mut done: FxHashSet<PathBuf> = FxHashSet::default();
        while let Some((name, entry)) = lazy.pop_first() {
            if !done.insert(entry.clone()) {
                continue;
            }
            let mut visited = FxHashSet::default();
            let mut order = Vec::new();
            self.walk(
                spec,
                sources,
                &entry,
                &mut visited,
                &mut order,
                &mut lazy,
                hashes,
                &mut outcome.errors,
            );
            let entry_id = Self::module_id(&spec.workspace_root, &entry);
            for module in &order {
                outcome.metafile.inputs.entry(module.id.clone()).or_insert(MetafileInput {
                    bytes: module.bytes,
                    imports: module.imports.clone(),
                    format: Some(module.format),
                });
            }
            // Lazy chunks never join the initial file set.
            self.emit_script_chunk(spec, &name, &order, &entry_id, outcome, file_type, false);
        }
    }

    fn bundle_styles(
        &self,
        spec: &BundleSpec,
        sources: &SourceFileCache,
        outcome: &mut BundleOutcome,
        hashes: &mut FxHashMap<PathBuf, [u8; 32]>,
    ) {
        for (chunk_name, entry) in &spec.entry_points {
            if !entry.is_file() {
                outcome.errors.push(Diagnostic::error(format!(
                    "Stylesheet entry '{}' does not exist",
                    entry.display()
                )));
                continue;
            }
            let mut visited = FxHashSet::default();
            let mut order = Vec::new();
            let mut lazy = BTreeMap::new();
            self.walk(
                spec,
                sources,
                entry,
                &mut visited,
                &mut order,
                &mut lazy,
                hashes,
                &mut outcome.errors,
            );

            let mut text = String::new();
            for module in &order {
                let body = css_import_regex().replace_all(&module.contents, "");
                if spec.optimize {
                    for line in body.lines() {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            text.push_str(trimmed);
                            text.push('\n');
                        }
                    }
                } else {
                    text.push_str(&body);
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                outcome.metafile.inputs.entry(module.id.clone()).or_insert(MetafileInput {
                    bytes: module.bytes,
                    imports: module.imports.clone(),
                    format: Some(ModuleFormat::Css),
                });
            }

            if let Some(rewrite) = &spec.url_rewrite {
                text = rewrite_css_urls(&text, rewrite);
            }

            let file_name = Self::hashed_name(chunk_name, "css", &text, spec.output_hashing);
            let entry_id = Self::module_id(&spec.workspace_root, entry);
            let mut inputs = FxHashMap::default();
            for module in &order {
                inputs.insert(module.id.clone(), module.bytes);
            }
            outcome.metafile.outputs.insert(
                file_name.clone(),
                MetafileOutput {
                    bytes: text.len() as u64,
                    inputs,
                    entry_point: Some(entry_id),
                },
            );
            outcome.initial_files.insert(
                chunk_name.to_string(),
                InitialFile {
                    file: file_name.clone(),
                    name: chunk_name.to_string(),
                    kind: InitialFileKind::Stylesheet,
                },
            );
            outcome
                .output_files
                .push(OutputFile::text(file_name, text, OutputFileType::Browser));
        }
    }
}

#[async_trait]
impl Bundle for FlatBundler {
    async fn bundle(
        &self,
        spec: &BundleSpec,
        sources: &SourceFileCache,
        cache: Option<&UnitCache>,
    ) -> crate::Result<BundleOutcome> {
        if let Some(cache) = cache {
            if cache.is_fresh(sources) {
                debug!(unit = %spec.unit_name, "inputs unchanged, reusing cached outputs");
                return Ok(BundleOutcome {
                    output_files: cache.output_files.clone(),
                    metafile: cache.metafile.clone(),
                    initial_files: cache.initial_files.clone(),
                    cache: Some(cache.clone()),
                    ..Default::default()
                });
            }
        }

        let mut outcome = BundleOutcome::default();
        let mut hashes = FxHashMap::default();

        match spec.kind {
            UnitKind::AppCode | UnitKind::ServerCode | UnitKind::GlobalScripts => {
                self.bundle_scripts(spec, sources, &mut outcome, &mut hashes);
            }
            UnitKind::GlobalStyles => {
                self.bundle_styles(spec, sources, &mut outcome, &mut hashes);
            }
        }

        if !outcome.has_errors() {
            outcome.cache = Some(UnitCache {
                file_hashes: hashes,
                output_files: outcome.output_files.clone(),
                metafile: outcome.metafile.clone(),
                initial_files: outcome.initial_files.clone(),
            });
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::FeatureSet;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn app_spec(root: &Path, entry: PathBuf) -> BundleSpec {
        BundleSpec {
            unit_name: "app".into(),
            kind: UnitKind::AppCode,
            workspace_root: root.to_path_buf(),
            entry_points: vec![("main".into(), entry)],
            platform: TargetPlatform::Browser,
            features: FeatureSet::default(),
            external: Vec::new(),
            sourcemap: false,
            optimize: false,
            output_hashing: false,
            url_rewrite: None,
        }
    }

    #[tokio::test]
    async fn static_imports_are_inlined_into_the_entry_chunk() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/util.js", "export const two = 2;\n");
        let entry = write(
            dir.path(),
            "src/main.js",
            "import { two } from './util';\nconsole.log(two);\n",
        );

        let outcome = FlatBundler::new()
            .bundle(&app_spec(dir.path(), entry), &SourceFileCache::new(), None)
            .await
            .unwrap();

        assert!(!outcome.has_errors());
        let main = outcome
            .output_files
            .iter()
            .find(|f| f.path == "main.js")
            .unwrap();
        let text = main.contents_text();
        assert!(text.contains("const two = 2"));
        assert!(text.contains("console.log(two)"));
        // Dependency text precedes the importer.
        assert!(text.find("const two").unwrap() < text.find("console.log").unwrap());
    }

    #[tokio::test]
    async fn dynamic_imports_become_lazy_chunks_outside_initial_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/admin.js", "export const admin = true;\n");
        let entry = write(
            dir.path(),
            "src/main.js",
            "const load = () => import('./admin');\nload();\n",
        );

        let outcome = FlatBundler::new()
            .bundle(&app_spec(dir.path(), entry), &SourceFileCache::new(), None)
            .await
            .unwrap();

        assert!(outcome.output_files.iter().any(|f| f.path == "admin.js"));
        assert!(outcome.initial_files.contains_key("main"));
        assert!(!outcome.initial_files.contains_key("admin"));
    }

    #[tokio::test]
    async fn unresolvable_import_is_a_diagnostic_not_an_err() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "src/main.js", "import './missing';\n");

        let outcome = FlatBundler::new()
            .bundle(&app_spec(dir.path(), entry), &SourceFileCache::new(), None)
            .await
            .unwrap();

        assert!(outcome.has_errors());
        assert!(outcome.errors[0].message.contains("./missing"));
        assert!(outcome.cache.is_none());
    }

    #[tokio::test]
    async fn output_hashing_varies_names_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "src/main.js", "console.log(1);\n");
        let mut spec = app_spec(dir.path(), entry.clone());
        spec.output_hashing = true;

        let first = FlatBundler::new()
            .bundle(&spec, &SourceFileCache::new(), None)
            .await
            .unwrap();
        let first_name = first.output_files[0].path.clone();
        assert!(first_name.starts_with("main-") && first_name.ends_with(".js"));

        std::fs::write(&entry, "console.log(2);\n").unwrap();
        let second = FlatBundler::new()
            .bundle(&spec, &SourceFileCache::new(), None)
            .await
            .unwrap();
        assert_ne!(first_name, second.output_files[0].path);
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits_rebundling() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "src/main.js", "console.log(1);\n");
        let spec = app_spec(dir.path(), entry);
        let sources = SourceFileCache::new();
        let bundler = FlatBundler::new();

        let first = bundler.bundle(&spec, &sources, None).await.unwrap();
        let cache = first.cache.clone().unwrap();

        let second = bundler.bundle(&spec, &sources, Some(&cache)).await.unwrap();
        assert_eq!(second.output_files, first.output_files);
        assert!(second.cache.is_some());
    }

    #[tokio::test]
    async fn style_unit_concatenates_and_rewrites_urls() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/reset.css", "body { margin: 0; }\n");
        let entry = write(
            dir.path(),
            "src/styles.css",
            "@import './reset.css';\n.hero { background: url('img/hero.png'); }\n",
        );
        let mut spec = app_spec(dir.path(), entry);
        spec.kind = UnitKind::GlobalStyles;
        spec.url_rewrite = Some(crate::stylesheets::UrlRewriteOptions {
            base_href: "/app/".into(),
            deploy_url: String::new(),
        });
        spec.entry_points[0].0 = "styles".into();

        let outcome = FlatBundler::new()
            .bundle(&spec, &SourceFileCache::new(), None)
            .await
            .unwrap();

        let css = outcome
            .output_files
            .iter()
            .find(|f| f.path == "styles.css")
            .unwrap();
        let text = css.contents_text();
        assert!(text.contains("margin: 0"));
        assert!(text.contains("url('/app/img/hero.png')"));
        assert_eq!(
            outcome.initial_files["styles"].kind,
            InitialFileKind::Stylesheet
        );
    }
}
