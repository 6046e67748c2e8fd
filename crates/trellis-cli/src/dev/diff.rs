//! Rebuild-to-rebuild output diffing.
//!
//! Converts the one-result-per-rebuild stream into minimal update
//! instructions for the long-lived in-memory server: only paths whose
//! content actually changed are reported, and records for files that
//! disappeared (a removed lazy chunk) are purged.

use rustc_hash::{FxHashMap, FxHashSet};
use sha2::{Digest, Sha256};
use trellis_bundler::OutputFile;

/// Per-path record carried across build cycles.
#[derive(Debug, Clone)]
pub struct OutputFileRecord {
    pub size: u64,
    /// Content hash. `.map` files are never hashed; they are
    /// size-compared only.
    pub hash: Option<[u8; 32]>,
    /// Whether the last cycle changed this file.
    pub updated: bool,
}

fn content_hash(contents: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hasher.finalize().into()
}

/// Tracks output files across rebuild cycles.
#[derive(Debug, Default)]
pub struct OutputDiffer {
    records: FxHashMap<String, OutputFileRecord>,
}

impl OutputDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one build result into the record map.
    ///
    /// Returns the paths whose content changed this cycle. Equal sizes
    /// trigger a hash comparison, except for sourcemaps which are
    /// size-compared only. Paths absent from this cycle are purged.
    pub fn update(&mut self, files: &[&OutputFile], index_path: &str) -> Vec<String> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        // The index document is always served even when no output file
        // carries its path (e.g. pre-rendered variants replaced it).
        seen.insert(index_path.to_string());

        let mut updated_paths = Vec::new();

        for file in files {
            seen.insert(file.path.clone());
            let size = file.contents.len() as u64;
            let is_map = file.path.ends_with(".map");

            // Hash only when the size comparison is inconclusive; a
            // size mismatch already proves the content changed.
            let unchanged = match self.records.get(&file.path) {
                Some(existing) if existing.size == size => {
                    is_map || existing.hash == Some(content_hash(&file.contents))
                }
                _ => false,
            };

            if unchanged {
                if let Some(existing) = self.records.get_mut(&file.path) {
                    existing.updated = false;
                }
            } else {
                let hash = if is_map {
                    None
                } else {
                    Some(content_hash(&file.contents))
                };
                self.records.insert(
                    file.path.clone(),
                    OutputFileRecord {
                        size,
                        hash,
                        updated: true,
                    },
                );
                updated_paths.push(file.path.clone());
            }
        }

        self.records.retain(|path, _| seen.contains(path));

        updated_paths
    }

    pub fn record(&self, path: &str) -> Option<&OutputFileRecord> {
        self.records.get(path)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_bundler::OutputFileType;

    fn file(path: &str, contents: &[u8]) -> OutputFile {
        OutputFile::new(path, contents.to_vec(), OutputFileType::Browser)
    }

    #[test]
    fn first_cycle_reports_everything() {
        let mut differ = OutputDiffer::new();
        let a = file("main.js", b"console.log(1)");
        let b = file("styles.css", b"body{}");

        let updated = differ.update(&[&a, &b], "index.html");
        assert_eq!(updated, vec!["main.js", "styles.css"]);
        assert_eq!(differ.len(), 2);
    }

    #[test]
    fn only_changed_file_is_reported() {
        let mut differ = OutputDiffer::new();
        let main_v1 = file("app.js", b"let x = 1;");
        let vendor = file("vendor.js", b"export const dep = 1;");
        differ.update(&[&main_v1, &vendor], "index.html");

        // Same length, different content: the hash comparison catches it.
        let main_v2 = file("app.js", b"let x = 2;");
        let updated = differ.update(&[&main_v2, &vendor], "index.html");
        assert_eq!(updated, vec!["app.js"]);
        assert!(differ.record("vendor.js").map(|r| !r.updated).unwrap());
    }

    #[test]
    fn sourcemaps_are_size_compared_only() {
        let mut differ = OutputDiffer::new();
        let map_v1 = file("app.js.map", b"{\"mappings\":\"AAAA\"}");
        differ.update(&[&map_v1], "index.html");

        // Same size, different bytes: maps skip hashing, so this counts
        // as unchanged.
        let map_v2 = file("app.js.map", b"{\"mappings\":\"BBBB\"}");
        let updated = differ.update(&[&map_v2], "index.html");
        assert!(updated.is_empty());
        assert!(differ.record("app.js.map").unwrap().hash.is_none());
    }

    #[test]
    fn removed_files_are_purged() {
        let mut differ = OutputDiffer::new();
        let main = file("main.js", b"1");
        let lazy = file("chunk-admin.js", b"2");
        differ.update(&[&main, &lazy], "index.html");
        assert_eq!(differ.len(), 2);

        differ.update(&[&main], "index.html");
        assert!(differ.record("chunk-admin.js").is_none());
        assert_eq!(differ.len(), 1);
    }

    #[test]
    fn index_path_survives_even_without_an_output_file() {
        let mut differ = OutputDiffer::new();
        let index = file("index.html", b"<html></html>");
        differ.update(&[&index], "index.html");

        // Next cycle emits no file at the index path; the seeded seen
        // set keeps the record alive.
        let main = file("main.js", b"1");
        differ.update(&[&main], "index.html");
        assert!(differ.record("index.html").is_some());
    }
}
