//! Produced artifact model.
//!
//! Every build stage communicates through [`OutputFile`] values: a
//! posix-style output-relative path, raw bytes, and a logical type that
//! decides which final output category the file lands in.

use serde::{Deserialize, Serialize};

/// Logical destination of a produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFileType {
    /// Served to browsers (bundles, stylesheets, index document).
    Browser,
    /// Used only during server-side rendering, never served directly.
    Server,
    /// Root-level metadata (stats.json, license text, per-locale copies).
    Root,
}

/// One produced artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Output-relative path, always forward slashes.
    pub path: String,
    pub contents: Vec<u8>,
    pub file_type: OutputFileType,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: Vec<u8>, file_type: OutputFileType) -> Self {
        Self {
            path: normalize_path(path.into()),
            contents,
            file_type,
        }
    }

    /// Convenience constructor for UTF-8 text artifacts.
    pub fn text(path: impl Into<String>, contents: impl Into<String>, file_type: OutputFileType) -> Self {
        Self::new(path, contents.into().into_bytes(), file_type)
    }

    /// Contents interpreted as UTF-8, lossily.
    pub fn contents_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }
}

/// Kind of an initial-load file reference in the generated entry document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialFileKind {
    Script,
    Stylesheet,
}

/// A file that must be referenced by the HTML document's initial
/// `<script>`/`<link>` tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialFile {
    /// Output path of the file.
    pub file: String,
    /// Logical chunk/bundle name.
    pub name: String,
    pub kind: InitialFileKind,
}

/// Normalize a path to forward slashes with no leading `./`.
pub fn normalize_path(path: impl AsRef<str>) -> String {
    let path = path.as_ref().replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

/// Dedupe a file sequence by `(path, type)`, keeping the last writer.
///
/// Successive stages may append replacements for the same path; merged
/// consumers (disk writer, dev server, service worker) see only the
/// final contents.
pub fn dedupe_last_wins(files: &[OutputFile]) -> Vec<&OutputFile> {
    let mut index = rustc_hash::FxHashMap::default();
    for (position, file) in files.iter().enumerate() {
        index.insert((file.path.as_str(), file.file_type), position);
    }
    let mut positions: Vec<usize> = index.into_values().collect();
    positions.sort_unstable();
    positions.into_iter().map(|p| &files[p]).collect()
}
