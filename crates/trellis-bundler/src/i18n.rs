//! Locale inlining.
//!
//! Runs strictly after every other post-processing stage: it rewrites
//! final artifacts, and any stage running after it would see only the
//! source-locale copies. Message placeholders of the form
//! `__i18n("<id>")__` are substituted from per-locale JSON translation
//! files, and `__LOCALE_ID__` is stamped with the locale identifier.
//! With more than one locale, each locale's artifacts land in a
//! `<locale>/` subdirectory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashMap;

use crate::diagnostics::Diagnostic;
use crate::output::{OutputFile, OutputFileType};

/// One target locale.
#[derive(Debug, Clone)]
pub struct LocaleDescription {
    /// BCP 47 identifier, e.g. `fr` or `en-US`.
    pub id: String,
    /// Translation file, absent for the source locale.
    pub translation_file: Option<PathBuf>,
}

/// Locale inlining configuration.
#[derive(Debug, Clone)]
pub struct I18nOptions {
    pub source_locale: String,
    pub locales: Vec<LocaleDescription>,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"__i18n\("([^"]+)"\)__"#).expect("placeholder pattern is valid"))
}

fn load_translations(path: &Path) -> crate::Result<FxHashMap<String, String>> {
    let raw = std::fs::read(path).map_err(|e| crate::Error::IoContext {
        message: format!("cannot read translation file '{}'", path.display()),
        source: e,
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

fn substitute(
    text: &str,
    locale: &str,
    translations: &FxHashMap<String, String>,
    file_path: &str,
    warnings: &mut Vec<Diagnostic>,
) -> String {
    let mut out = placeholder_regex()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let id = &caps[1];
            match translations.get(id) {
                Some(message) => message.clone(),
                None => {
                    warnings.push(Diagnostic::warning(format!(
                        "No translation for message '{}' in locale '{}' ({})",
                        id, locale, file_path
                    )));
                    id.to_string()
                }
            }
        })
        .into_owned();
    out = out.replace("__LOCALE_ID__", locale);
    out
}

fn stamp_lang_attribute(html: &str, locale: &str) -> String {
    static LANG_RE: OnceLock<Regex> = OnceLock::new();
    let re = LANG_RE
        .get_or_init(|| Regex::new(r#"<html([^>]*?)\slang="[^"]*""#).expect("lang pattern is valid"));
    if re.is_match(html) {
        re.replace(html, format!(r#"<html${{1}} lang="{}""#, locale))
            .into_owned()
    } else {
        html.replacen("<html", &format!(r#"<html lang="{}""#, locale), 1)
    }
}

fn is_text_artifact(path: &str) -> bool {
    path.ends_with(".js")
        || path.ends_with(".mjs")
        || path.ends_with(".css")
        || path.ends_with(".html")
}

/// Produce per-locale copies of the final artifact set.
///
/// Returns the localized files plus translation warnings. The input set
/// must be fully post-processed; this stage runs last.
pub fn inline_locales(
    options: &I18nOptions,
    files: &[&OutputFile],
) -> crate::Result<(Vec<OutputFile>, Vec<Diagnostic>)> {
    let mut localized = Vec::new();
    let mut warnings = Vec::new();
    let nested = options.locales.len() > 1;

    for locale in &options.locales {
        let translations = match &locale.translation_file {
            Some(path) => load_translations(path)?,
            None => FxHashMap::default(),
        };

        for file in files {
            let path = if nested {
                format!("{}/{}", locale.id, file.path)
            } else {
                file.path.clone()
            };

            if !is_text_artifact(&file.path) {
                localized.push(OutputFile::new(path, file.contents.clone(), file.file_type));
                continue;
            }

            let text = file.contents_text();
            let mut replaced =
                substitute(&text, &locale.id, &translations, &file.path, &mut warnings);
            if file.path.ends_with(".html") {
                replaced = stamp_lang_attribute(&replaced, &locale.id);
            }
            localized.push(OutputFile::new(path, replaced.into_bytes(), file.file_type));
        }
    }

    Ok((localized, warnings))
}
