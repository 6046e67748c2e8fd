//! Service-worker manifest generation.
//!
//! Produces the `ngsw.json` manifest the runtime service worker consumes:
//! configured asset groups resolved against the current output file set,
//! plus a `hashTable` mapping every served URL to the SHA-256 digest of
//! its contents. Unlike other post-processing stages, a failure here is
//! fatal for the build cycle; a stale or missing manifest would leave
//! clients pinned to outdated caches.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::output::{OutputFile, OutputFileType};

/// Build-time service worker configuration.
#[derive(Debug, Clone)]
pub struct ServiceWorkerOptions {
    /// Path of the worker configuration file, relative to the workspace.
    pub config_path: String,
    /// URL of the index document, e.g. `/index.html`.
    pub index: String,
}

/// On-disk worker configuration (`ngsw-config.json` shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerConfig {
    #[serde(default)]
    asset_groups: Vec<AssetGroupConfig>,
    #[serde(default)]
    app_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetGroupConfig {
    name: String,
    #[serde(default = "default_install_mode")]
    install_mode: String,
    #[serde(default = "default_update_mode")]
    update_mode: String,
    resources: ResourcesConfig,
}

fn default_install_mode() -> String {
    "prefetch".to_string()
}

fn default_update_mode() -> String {
    "prefetch".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct ResourcesConfig {
    #[serde(default)]
    files: Vec<String>,
}

/// Generated manifest, serialized as `ngsw.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    config_version: u32,
    timestamp: u64,
    index: String,
    asset_groups: Vec<ManifestAssetGroup>,
    hash_table: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    app_data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestAssetGroup {
    name: String,
    install_mode: String,
    update_mode: String,
    urls: Vec<String>,
    patterns: Vec<String>,
}

fn sha256_hex(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn glob_matches(glob: &str, path: &str) -> bool {
    // File globs in worker configs use the same dialect as asset rules.
    let mut pattern = String::from("^");
    let mut chars = glob.trim_start_matches('/').chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        pattern.push_str("(?:.*/)?");
                    } else {
                        pattern.push_str(".*");
                    }
                } else {
                    pattern.push_str("[^/]*");
                }
            }
            '?' => pattern.push_str("[^/]"),
            ch => pattern.push_str(&regex::escape(&ch.to_string())),
        }
    }
    pattern.push('$');
    regex::Regex::new(&pattern)
        .map(|re| re.is_match(path))
        .unwrap_or(false)
}

/// Generate the service-worker manifest for the final output file set.
///
/// `files` must already have per-path replacements resolved; hashing a
/// superseded artifact would poison client caches. Errors here abort the
/// remaining build stages.
pub fn augment_service_worker(
    workspace_root: &Path,
    options: &ServiceWorkerOptions,
    files: &[&OutputFile],
    timestamp: u64,
) -> crate::Result<OutputFile> {
    let config_path = workspace_root.join(&options.config_path);
    let raw = std::fs::read(&config_path).map_err(|e| {
        crate::Error::ServiceWorker(format!(
            "cannot read configuration '{}': {}",
            config_path.display(),
            e
        ))
    })?;
    let config: WorkerConfig = serde_json::from_slice(&raw)
        .map_err(|e| crate::Error::ServiceWorker(format!("invalid configuration: {}", e)))?;

    let served: FxHashMap<String, &OutputFile> = files
        .iter()
        .filter(|f| f.file_type == OutputFileType::Browser)
        .map(|f| (format!("/{}", f.path), *f))
        .collect();

    let mut hash_table = std::collections::BTreeMap::new();
    let mut asset_groups = Vec::new();
    for group in config.asset_groups {
        let mut urls: Vec<String> = served
            .keys()
            .filter(|url| {
                group
                    .resources
                    .files
                    .iter()
                    .any(|glob| glob_matches(glob, url.trim_start_matches('/')))
            })
            .cloned()
            .collect();
        urls.sort();
        for url in &urls {
            let file = served[url];
            hash_table.insert(url.clone(), sha256_hex(&file.contents));
        }
        asset_groups.push(ManifestAssetGroup {
            name: group.name,
            install_mode: group.install_mode,
            update_mode: group.update_mode,
            urls,
            patterns: Vec::new(),
        });
    }

    let manifest = Manifest {
        config_version: 1,
        timestamp,
        index: options.index.clone(),
        asset_groups,
        hash_table,
        app_data: config.app_data,
    };
    let contents = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| crate::Error::ServiceWorker(format!("manifest serialization: {}", e)))?;

    Ok(OutputFile::new("ngsw.json", contents, OutputFileType::Browser))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "assetGroups": [{
            "name": "app",
            "resources": { "files": ["/*.js", "/index.html"] }
        }]
    }"#;

    fn options() -> ServiceWorkerOptions {
        ServiceWorkerOptions {
            config_path: "sw-config.json".into(),
            index: "/index.html".into(),
        }
    }

    #[test]
    fn manifest_hashes_matching_browser_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sw-config.json"), CONFIG).unwrap();

        let main = OutputFile::text("main.js", "code", OutputFileType::Browser);
        let index = OutputFile::text("index.html", "<html>", OutputFileType::Browser);
        let server = OutputFile::text("server.js", "ssr", OutputFileType::Server);
        let files = vec![&main, &index, &server];

        let manifest_file =
            augment_service_worker(dir.path(), &options(), &files, 123).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_slice(&manifest_file.contents).unwrap();

        assert_eq!(manifest["index"], "/index.html");
        let hash_table = manifest["hashTable"].as_object().unwrap();
        assert!(hash_table.contains_key("/main.js"));
        assert!(hash_table.contains_key("/index.html"));
        assert!(!hash_table.contains_key("/server.js"));
        assert_eq!(
            hash_table["/main.js"],
            sha256_hex(b"code").as_str(),
        );
    }

    #[test]
    fn missing_configuration_is_a_service_worker_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = augment_service_worker(dir.path(), &options(), &[], 0).unwrap_err();
        assert!(matches!(err, crate::Error::ServiceWorker(_)));
    }

    #[test]
    fn invalid_json_configuration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sw-config.json"), "not json").unwrap();
        let err = augment_service_worker(dir.path(), &options(), &[], 0).unwrap_err();
        assert!(matches!(err, crate::Error::ServiceWorker(_)));
    }
}
