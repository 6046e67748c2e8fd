//! Third-party license extraction.
//!
//! Collects license text for every `node_modules` package that
//! contributed code to the build and concatenates it into a single
//! root-level artifact. Packages without discoverable license text are
//! listed by name only.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::metafile::Metafile;

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    license: Option<String>,
}

const LICENSE_FILE_NAMES: &[&str] = &["LICENSE", "LICENSE.md", "LICENSE.txt", "license", "License"];

fn package_name(module_path: &str) -> Option<&str> {
    let rest = module_path.rsplit_once("node_modules/").map(|(_, r)| r)?;
    let mut segments = rest.splitn(3, '/');
    let first = segments.next()?;
    if let Some(scoped) = first.strip_prefix('@') {
        let second = segments.next()?;
        Some(&rest[..1 + scoped.len() + 1 + second.len()])
    } else {
        Some(first)
    }
}

/// Produce the concatenated license text for all bundled packages.
///
/// Returns `None` when no third-party code contributed to the build.
pub fn extract_licenses(metafile: &Metafile, workspace_root: &Path) -> Option<String> {
    let packages: BTreeSet<&str> = metafile
        .inputs
        .keys()
        .filter_map(|path| package_name(path))
        .collect();
    if packages.is_empty() {
        return None;
    }

    let mut out = String::new();
    for package in packages {
        let package_dir = workspace_root.join("node_modules").join(package);

        let spdx = std::fs::read(package_dir.join("package.json"))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<PackageManifest>(&bytes).ok())
            .and_then(|manifest| manifest.license);

        if !out.is_empty() {
            out.push_str("\n--------------------------------------------------------------------------------\n\n");
        }
        out.push_str(package);
        if let Some(spdx) = &spdx {
            out.push_str(&format!(" ({})", spdx));
        }
        out.push('\n');

        let text = LICENSE_FILE_NAMES
            .iter()
            .find_map(|name| std::fs::read_to_string(package_dir.join(name)).ok());
        match text {
            Some(text) => {
                out.push('\n');
                out.push_str(text.trim_end());
                out.push('\n');
            }
            None => debug!(package, "no license file found"),
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metafile::MetafileInput;

    fn metafile_for(paths: &[&str]) -> Metafile {
        let mut metafile = Metafile::new();
        for path in paths {
            metafile
                .inputs
                .insert(path.to_string(), MetafileInput::default());
        }
        metafile
    }

    #[test]
    fn no_third_party_inputs_yields_none() {
        let metafile = metafile_for(&["src/main.ts", "src/app.ts"]);
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_licenses(&metafile, dir.path()).is_none());
    }

    #[test]
    fn license_text_and_spdx_id_are_included() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("node_modules/leftpad");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(package.join("package.json"), br#"{"license":"MIT"}"#).unwrap();
        std::fs::write(package.join("LICENSE"), "Permission is hereby granted...").unwrap();

        let metafile = metafile_for(&["node_modules/leftpad/index.js", "src/main.ts"]);
        let text = extract_licenses(&metafile, dir.path()).unwrap();
        assert!(text.contains("leftpad (MIT)"));
        assert!(text.contains("Permission is hereby granted"));
    }

    #[test]
    fn packages_are_listed_once_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha"] {
            std::fs::create_dir_all(dir.path().join("node_modules").join(name)).unwrap();
        }
        let metafile = metafile_for(&[
            "node_modules/zeta/index.js",
            "node_modules/alpha/index.js",
            "node_modules/alpha/util.js",
        ]);
        let text = extract_licenses(&metafile, dir.path()).unwrap();
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
        assert_eq!(text.matches("alpha").count(), 1);
    }
}
