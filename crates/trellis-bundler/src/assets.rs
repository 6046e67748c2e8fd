//! Static asset collection.
//!
//! Resolves configured glob patterns against the workspace and produces
//! `(source, destination)` copy instructions. Assets are copied verbatim,
//! never transformed.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::output::normalize_path;

/// One configured asset rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPattern {
    /// Glob matched relative to `input`, e.g. `**/*.png`.
    pub glob: String,
    /// Directory the glob is evaluated in, relative to the workspace root.
    pub input: String,
    /// Output subdirectory the matches land in.
    #[serde(default)]
    pub output: String,
    /// Globs excluded from the match set.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl AssetPattern {
    /// Shorthand for copying one directory verbatim.
    pub fn directory(input: impl Into<String>) -> Self {
        Self {
            glob: "**/*".into(),
            input: input.into(),
            output: String::new(),
            ignore: Vec::new(),
        }
    }
}

/// A resolved copy instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub source: PathBuf,
    /// Output-relative destination path.
    pub destination: String,
}

/// Translate a glob into an anchored regex.
///
/// Supports `**` (any depth), `*` (one segment), and `?`; everything
/// else is literal.
fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` also matches the empty prefix.
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
    Regex::new(&pattern)
}

/// Resolve every asset pattern to concrete copy instructions.
///
/// Missing input directories produce an error; an existing directory
/// with no matches is valid and contributes nothing.
pub fn collect_assets(
    workspace_root: &Path,
    patterns: &[AssetPattern],
) -> crate::Result<Vec<AssetFile>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let input_dir = workspace_root.join(&pattern.input);
        if !input_dir.is_dir() {
            return Err(crate::Error::InvalidConfig(format!(
                "Asset input directory '{}' does not exist",
                pattern.input
            )));
        }

        let matcher = glob_to_regex(&pattern.glob)
            .map_err(|e| crate::Error::InvalidConfig(format!("Invalid asset glob '{}': {}", pattern.glob, e)))?;
        let ignores = pattern
            .ignore
            .iter()
            .map(|g| glob_to_regex(g).map_err(|e| crate::Error::InvalidConfig(format!("Invalid ignore glob '{}': {}", g, e))))
            .collect::<crate::Result<Vec<_>>>()?;

        let mut entries: Vec<PathBuf> = WalkDir::new(&input_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        entries.sort();

        for source in entries {
            let relative = source
                .strip_prefix(&input_dir)
                .map(|p| normalize_path(p.to_string_lossy()))
                .unwrap_or_default();
            if !matcher.is_match(&relative) || ignores.iter().any(|i| i.is_match(&relative)) {
                continue;
            }
            let destination = if pattern.output.is_empty() {
                relative
            } else {
                normalize_path(format!("{}/{}", pattern.output.trim_matches('/'), relative))
            };
            files.push(AssetFile { source, destination });
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn directory_pattern_collects_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "public/favicon.ico");
        touch(dir.path(), "public/img/logo.png");

        let files = collect_assets(dir.path(), &[AssetPattern::directory("public")]).unwrap();
        let destinations: Vec<_> = files.iter().map(|f| f.destination.as_str()).collect();
        assert_eq!(destinations, vec!["favicon.ico", "img/logo.png"]);
    }

    #[test]
    fn glob_and_ignore_filter_matches() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "public/a.png");
        touch(dir.path(), "public/b.txt");
        touch(dir.path(), "public/skip/c.png");

        let pattern = AssetPattern {
            glob: "**/*.png".into(),
            input: "public".into(),
            output: "media".into(),
            ignore: vec!["skip/**".into()],
        };
        let files = collect_assets(dir.path(), &[pattern]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].destination, "media/a.png");
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_assets(dir.path(), &[AssetPattern::directory("nope")]).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidConfig(_)));
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "public/a.png");
        touch(dir.path(), "public/deep/b.png");

        let pattern = AssetPattern {
            glob: "*.png".into(),
            input: "public".into(),
            output: String::new(),
            ignore: Vec::new(),
        };
        let files = collect_assets(dir.path(), &[pattern]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].destination, "a.png");
    }
}
