//! Configuration schema.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use trellis_bundler::{AssetPattern, Budget};

/// Complete project configuration, matching `trellis.config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrellisConfig {
    /// Browser entry points, relative to the project root.
    pub entry_points: Vec<String>,
    pub global_styles: Vec<String>,
    /// Global stylesheet groups bundled but not referenced from the
    /// index document.
    pub lazy_global_styles: Vec<String>,
    pub global_scripts: Vec<String>,
    pub lazy_global_scripts: Vec<String>,
    pub server_entry: Option<String>,
    pub out_dir: PathBuf,
    /// Browserslist-style support strings, e.g. `chrome 90`.
    pub supported_browsers: Vec<String>,
    /// Import specifiers left unresolved in the output.
    pub external: Vec<String>,
    pub sourcemap: bool,
    pub optimize: bool,
    pub output_hashing: bool,
    pub base_href: Option<String>,
    pub deploy_url: Option<String>,
    pub index: Option<IndexConfig>,
    pub assets: Vec<AssetPattern>,
    pub budgets: Vec<Budget>,
    pub allowed_common_js_dependencies: Vec<String>,
    pub extract_licenses: bool,
    pub service_worker: Option<ServiceWorkerConfig>,
    pub i18n: Option<LocaleConfig>,
    pub stats_json: bool,
    pub clean: bool,
    pub cwd: Option<PathBuf>,
    pub dev: DevSection,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            entry_points: vec!["src/main.js".to_string()],
            global_styles: Vec::new(),
            lazy_global_styles: Vec::new(),
            global_scripts: Vec::new(),
            lazy_global_scripts: Vec::new(),
            server_entry: None,
            out_dir: PathBuf::from("dist"),
            supported_browsers: Vec::new(),
            external: Vec::new(),
            sourcemap: false,
            optimize: false,
            output_hashing: false,
            base_href: None,
            deploy_url: None,
            index: None,
            assets: Vec::new(),
            budgets: Vec::new(),
            allowed_common_js_dependencies: Vec::new(),
            extract_licenses: false,
            service_worker: None,
            i18n: None,
            stats_json: false,
            clean: false,
            cwd: None,
            dev: DevSection::default(),
        }
    }
}

/// Entry document section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexConfig {
    pub input: String,
    pub output: String,
    pub subresource_integrity: bool,
    pub cross_origin: Option<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            input: "src/index.html".to_string(),
            output: "index.html".to_string(),
            subresource_integrity: false,
            cross_origin: None,
        }
    }
}

/// Service worker section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWorkerConfig {
    /// Worker configuration file, relative to the project root.
    pub config_path: String,
    /// Served URL of the index document.
    #[serde(default = "default_sw_index")]
    pub index: String,
}

fn default_sw_index() -> String {
    "/index.html".to_string()
}

/// Locale inlining section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleConfig {
    pub source_locale: String,
    /// Locale id to translation file path; the source locale may map to
    /// no file.
    #[serde(default)]
    pub locales: FxHashMap<String, Option<String>>,
}

/// Development server section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevSection {
    pub port: u16,
    pub host: String,
    pub debounce_ms: u64,
    /// Path fragments excluded from the file watcher.
    pub watch_ignore: Vec<String>,
}

impl Default for DevSection {
    fn default() -> Self {
        Self {
            port: 4200,
            host: "127.0.0.1".to_string(),
            debounce_ms: 150,
            watch_ignore: vec![
                "node_modules".to_string(),
                "dist".to_string(),
                ".git".to_string(),
            ],
        }
    }
}
