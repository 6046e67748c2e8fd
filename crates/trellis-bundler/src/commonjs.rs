//! CommonJS usage checker.
//!
//! CommonJS modules defeat tree-shaking, so their presence in a browser
//! bundle is surfaced as advisory warnings. Findings never fail a build.

use rustc_hash::FxHashSet;

use crate::diagnostics::Diagnostic;
use crate::metafile::{Metafile, ModuleFormat};

/// Package name for a module path, honoring scoped packages when the
/// module lives under `node_modules`.
fn package_name(module_path: &str) -> Option<&str> {
    let rest = module_path.rsplit_once("node_modules/").map(|(_, r)| r)?;
    let mut segments = rest.splitn(3, '/');
    let first = segments.next()?;
    if let Some(scoped) = first.strip_prefix('@') {
        let second = segments.next()?;
        let len = 1 + scoped.len() + 1 + second.len();
        Some(&rest[..len])
    } else {
        Some(first)
    }
}

fn is_allowed(package: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| {
        if let Some(prefix) = entry.strip_suffix('*') {
            package.starts_with(prefix)
        } else {
            package == entry
        }
    })
}

/// Scan the metafile for CommonJS modules and report one warning per
/// offending package, naming the importing module when known.
pub fn check_commonjs_modules(metafile: &Metafile, allowed: &[String]) -> Vec<Diagnostic> {
    let mut reported: FxHashSet<String> = FxHashSet::default();
    let mut warnings = Vec::new();

    let mut cjs_modules: Vec<&String> = metafile
        .inputs
        .iter()
        .filter(|(_, input)| input.format == Some(ModuleFormat::Cjs))
        .map(|(path, _)| path)
        .collect();
    cjs_modules.sort();

    for module in cjs_modules {
        let Some(package) = package_name(module) else {
            // First-party CommonJS files are reported by path.
            if reported.insert(module.clone()) {
                warnings.push(Diagnostic::warning(format!(
                    "Module '{}' uses CommonJS and may prevent dead-code elimination",
                    module
                )));
            }
            continue;
        };
        if is_allowed(package, allowed) || !reported.insert(package.to_string()) {
            continue;
        }

        let importer = metafile
            .inputs
            .iter()
            .find(|(_, input)| input.imports.iter().any(|i| i == module))
            .map(|(path, _)| path.as_str());

        let mut message = format!(
            "Package '{}' uses CommonJS and may prevent dead-code elimination",
            package
        );
        if let Some(importer) = importer {
            message.push_str(&format!(" (imported by '{}')", importer));
        }
        message.push_str(". Consider an ESM alternative or add it to 'allowedCommonJsDependencies'.");
        warnings.push(Diagnostic::warning(message));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metafile::MetafileInput;

    fn metafile_with(path: &str, format: ModuleFormat) -> Metafile {
        let mut metafile = Metafile::new();
        metafile.inputs.insert(
            path.to_string(),
            MetafileInput {
                bytes: 10,
                imports: Vec::new(),
                format: Some(format),
            },
        );
        metafile
    }

    #[test]
    fn cjs_package_produces_one_warning() {
        let metafile = metafile_with("node_modules/lodash/index.js", ModuleFormat::Cjs);
        let warnings = check_commonjs_modules(&metafile, &[]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'lodash'"));
        assert!(!warnings[0].is_error());
    }

    #[test]
    fn scoped_package_name_is_extracted() {
        let metafile = metafile_with("node_modules/@acme/util/lib/a.js", ModuleFormat::Cjs);
        let warnings = check_commonjs_modules(&metafile, &[]);
        assert!(warnings[0].message.contains("'@acme/util'"));
    }

    #[test]
    fn allowed_list_suppresses_warnings() {
        let metafile = metafile_with("node_modules/lodash/index.js", ModuleFormat::Cjs);
        assert!(check_commonjs_modules(&metafile, &["lodash".into()]).is_empty());
        assert!(check_commonjs_modules(&metafile, &["lod*".into()]).is_empty());
    }

    #[test]
    fn esm_modules_are_ignored() {
        let metafile = metafile_with("node_modules/rxjs/index.js", ModuleFormat::Esm);
        assert!(check_commonjs_modules(&metafile, &[]).is_empty());
    }

    #[test]
    fn multiple_modules_of_one_package_report_once() {
        let mut metafile = metafile_with("node_modules/lodash/a.js", ModuleFormat::Cjs);
        metafile.inputs.insert(
            "node_modules/lodash/b.js".into(),
            MetafileInput {
                bytes: 5,
                imports: Vec::new(),
                format: Some(ModuleFormat::Cjs),
            },
        );
        assert_eq!(check_commonjs_modules(&metafile, &[]).len(), 1);
    }
}
