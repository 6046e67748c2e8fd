//! Entry document generation.
//!
//! Rewrites a project-provided HTML template so it references exactly
//! the initial files of the current build: stylesheet `<link>` tags are
//! appended to `<head>`, module `<script>` tags to `<body>`, and the
//! document `<base href>` reflects configuration. Lazy chunks are never
//! referenced.

use base64::Engine;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha384};

use crate::diagnostics::Diagnostic;
use crate::output::{InitialFile, InitialFileKind};

/// Inputs for one entry-document generation pass.
#[derive(Debug, Clone, Default)]
pub struct IndexHtmlGenerator {
    pub base_href: Option<String>,
    /// Emit `integrity` attributes on generated tags.
    pub subresource_integrity: bool,
    /// `crossorigin` attribute value, e.g. `anonymous`.
    pub cross_origin: Option<String>,
}

/// Generated entry document.
#[derive(Debug, Clone)]
pub struct IndexHtmlResult {
    pub content: String,
    /// Variant used by server-side rendering, without any inline style
    /// optimizations applied to `content`.
    pub content_without_critical_css: String,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl IndexHtmlGenerator {
    /// Rewrite `template` against the build's initial file set.
    ///
    /// `file_contents` supplies artifact bytes for integrity hashing and
    /// is only consulted when `subresource_integrity` is set.
    pub fn generate(
        &self,
        template: &str,
        initial_files: &FxHashMap<String, InitialFile>,
        file_contents: &FxHashMap<String, Vec<u8>>,
    ) -> IndexHtmlResult {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        // Stable tag order: stylesheets before scripts, each sorted by
        // chunk name.
        let mut ordered: Vec<&InitialFile> = initial_files.values().collect();
        ordered.sort_by_key(|f| (f.kind == InitialFileKind::Script, f.name.as_str()));

        let mut head_tags = String::new();
        let mut body_tags = String::new();
        for initial in ordered {
            let integrity = if self.subresource_integrity {
                match file_contents.get(&initial.file) {
                    Some(contents) => Some(integrity_value(contents)),
                    None => {
                        errors.push(Diagnostic::error(format!(
                            "Cannot compute integrity for missing file '{}'",
                            initial.file
                        )));
                        None
                    }
                }
            } else {
                None
            };
            let mut extra = String::new();
            if let Some(integrity) = integrity {
                extra.push_str(&format!(" integrity=\"{}\"", integrity));
            }
            if let Some(cross_origin) = &self.cross_origin {
                extra.push_str(&format!(" crossorigin=\"{}\"", cross_origin));
            }
            match initial.kind {
                InitialFileKind::Stylesheet => head_tags.push_str(&format!(
                    "  <link rel=\"stylesheet\" href=\"{}\"{}>\n",
                    initial.file, extra
                )),
                InitialFileKind::Script => body_tags.push_str(&format!(
                    "  <script src=\"{}\" type=\"module\"{}></script>\n",
                    initial.file, extra
                )),
            }
        }

        let mut content = template.to_string();
        if let Some(base_href) = &self.base_href {
            content = set_base_href(content, base_href, &mut warnings);
        }
        content = insert_before(content, "</head>", &head_tags, &mut warnings);
        content = insert_before(content, "</body>", &body_tags, &mut warnings);

        IndexHtmlResult {
            content_without_critical_css: content.clone(),
            content,
            warnings,
            errors,
        }
    }
}

/// `sha384-<base64 digest>`, the integrity format browsers expect.
fn integrity_value(contents: &[u8]) -> String {
    let mut hasher = Sha384::new();
    hasher.update(contents);
    let digest = hasher.finalize();
    format!(
        "sha384-{}",
        base64::engine::general_purpose::STANDARD.encode(digest)
    )
}

fn set_base_href(content: String, base_href: &str, warnings: &mut Vec<Diagnostic>) -> String {
    if let Some(start) = content.find("<base") {
        let Some(end_offset) = content[start..].find('>') else {
            warnings.push(Diagnostic::warning(
                "Malformed <base> tag in index template; base href not updated",
            ));
            return content;
        };
        let mut updated = content.clone();
        updated.replace_range(
            start..start + end_offset + 1,
            &format!("<base href=\"{}\">", base_href),
        );
        return updated;
    }
    insert_after(
        content,
        "<head>",
        &format!("\n  <base href=\"{}\">", base_href),
        warnings,
    )
}

fn insert_before(
    content: String,
    marker: &str,
    insertion: &str,
    warnings: &mut Vec<Diagnostic>,
) -> String {
    if insertion.is_empty() {
        return content;
    }
    match content.find(marker) {
        Some(position) => {
            let mut updated = content;
            updated.insert_str(position, insertion);
            updated
        }
        None => {
            warnings.push(Diagnostic::warning(format!(
                "Missing '{}' in index template; generated tags appended at end",
                marker
            )));
            content + insertion
        }
    }
}

fn insert_after(
    content: String,
    marker: &str,
    insertion: &str,
    warnings: &mut Vec<Diagnostic>,
) -> String {
    match content.find(marker) {
        Some(position) => {
            let mut updated = content;
            updated.insert_str(position + marker.len(), insertion);
            updated
        }
        None => {
            warnings.push(Diagnostic::warning(format!(
                "Missing '{}' in index template; base href not inserted",
                marker
            )));
            content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str =
        "<html><head><title>t</title></head><body><app-root></app-root></body></html>";

    fn initial(name: &str, file: &str, kind: InitialFileKind) -> (String, InitialFile) {
        (
            name.to_string(),
            InitialFile {
                file: file.to_string(),
                name: name.to_string(),
                kind,
            },
        )
    }

    #[test]
    fn stylesheets_land_in_head_and_scripts_in_body() {
        let files: FxHashMap<_, _> = [
            initial("main", "main.js", InitialFileKind::Script),
            initial("styles", "styles.css", InitialFileKind::Stylesheet),
        ]
        .into_iter()
        .collect();

        let result = IndexHtmlGenerator::default().generate(TEMPLATE, &files, &Default::default());
        assert!(result.errors.is_empty());
        let head = &result.content[..result.content.find("</head>").unwrap() + 7];
        assert!(head.contains("styles.css"));
        assert!(!head.contains("main.js"));
        assert!(result.content.contains("<script src=\"main.js\" type=\"module\"></script>"));
    }

    #[test]
    fn tag_order_is_stable_across_runs() {
        let files: FxHashMap<_, _> = [
            initial("b", "b.js", InitialFileKind::Script),
            initial("a", "a.js", InitialFileKind::Script),
        ]
        .into_iter()
        .collect();

        let result = IndexHtmlGenerator::default().generate(TEMPLATE, &files, &Default::default());
        let a = result.content.find("a.js").unwrap();
        let b = result.content.find("b.js").unwrap();
        assert!(a < b);
    }

    #[test]
    fn base_href_is_inserted_when_absent_and_replaced_when_present() {
        let generator = IndexHtmlGenerator {
            base_href: Some("/app/".into()),
            ..Default::default()
        };
        let result = generator.generate(TEMPLATE, &Default::default(), &Default::default());
        assert!(result.content.contains("<base href=\"/app/\">"));

        let with_base = TEMPLATE.replace("<head>", "<head><base href=\"/old/\">");
        let result = generator.generate(&with_base, &Default::default(), &Default::default());
        assert!(result.content.contains("<base href=\"/app/\">"));
        assert!(!result.content.contains("/old/"));
    }

    #[test]
    fn integrity_attributes_use_sha384() {
        let files: FxHashMap<_, _> =
            [initial("main", "main.js", InitialFileKind::Script)].into_iter().collect();
        let contents: FxHashMap<_, _> =
            [("main.js".to_string(), b"console.log(1);".to_vec())].into_iter().collect();
        let generator = IndexHtmlGenerator {
            subresource_integrity: true,
            cross_origin: Some("anonymous".into()),
            ..Default::default()
        };

        let result = generator.generate(TEMPLATE, &files, &contents);
        assert!(result.errors.is_empty());
        assert!(result.content.contains("integrity=\"sha384-"));
        assert!(result.content.contains("crossorigin=\"anonymous\""));
    }

    #[test]
    fn missing_file_contents_with_sri_is_an_error() {
        let files: FxHashMap<_, _> =
            [initial("main", "main.js", InitialFileKind::Script)].into_iter().collect();
        let generator = IndexHtmlGenerator {
            subresource_integrity: true,
            ..Default::default()
        };
        let result = generator.generate(TEMPLATE, &files, &Default::default());
        assert_eq!(result.errors.len(), 1);
    }
}
