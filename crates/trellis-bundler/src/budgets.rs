//! Bundle size budget checking.
//!
//! Budgets are advisory: exceeding a threshold produces diagnostics that
//! are reported alongside compile output but never abort the build or
//! skip later stages.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::output::{InitialFile, OutputFile, OutputFileType};

/// What a budget measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetType {
    /// Combined size of the initial load.
    Initial,
    /// Combined size of all browser output.
    All,
    /// Combined size of all scripts.
    AllScript,
    /// Each individual script.
    AnyScript,
    /// Each individual browser file.
    Any,
    /// One named bundle.
    Bundle,
}

/// One configured size budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(rename = "type")]
    pub budget_type: BudgetType,
    /// Bundle name, required for [`BudgetType::Bundle`].
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub maximum_warning: Option<String>,
    #[serde(default)]
    pub maximum_error: Option<String>,
    #[serde(default)]
    pub minimum_warning: Option<String>,
    #[serde(default)]
    pub minimum_error: Option<String>,
}

/// Parse a size threshold like `500kb`, `2mb`, `1.5mb`, or `120000`.
pub fn parse_size(input: &str) -> Option<u64> {
    let input = input.trim().to_ascii_lowercase();
    let (number, multiplier) = if let Some(n) = input.strip_suffix("kb") {
        (n, 1024.0)
    } else if let Some(n) = input.strip_suffix("mb") {
        (n, 1024.0 * 1024.0)
    } else if let Some(n) = input.strip_suffix("gb") {
        (n, 1024.0 * 1024.0 * 1024.0)
    } else if let Some(n) = input.strip_suffix('b') {
        (n, 1.0)
    } else {
        (input.as_str(), 1.0)
    };
    let value: f64 = number.trim().parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier) as u64)
}

fn is_script(path: &str) -> bool {
    path.ends_with(".js") || path.ends_with(".mjs")
}

struct Measurement {
    label: String,
    size: u64,
}

fn measure(
    budget: &Budget,
    files: &[&OutputFile],
    initial_files: &FxHashMap<String, InitialFile>,
) -> Vec<Measurement> {
    let browser: Vec<&&OutputFile> = files
        .iter()
        .filter(|f| f.file_type == OutputFileType::Browser && !f.path.ends_with(".map"))
        .collect();

    match budget.budget_type {
        BudgetType::Initial => {
            let initial_paths: Vec<&str> =
                initial_files.values().map(|f| f.file.as_str()).collect();
            let size = browser
                .iter()
                .filter(|f| initial_paths.contains(&f.path.as_str()))
                .map(|f| f.size())
                .sum();
            vec![Measurement {
                label: "initial".into(),
                size,
            }]
        }
        BudgetType::All => vec![Measurement {
            label: "all".into(),
            size: browser.iter().map(|f| f.size()).sum(),
        }],
        BudgetType::AllScript => vec![Measurement {
            label: "all scripts".into(),
            size: browser
                .iter()
                .filter(|f| is_script(&f.path))
                .map(|f| f.size())
                .sum(),
        }],
        BudgetType::AnyScript => browser
            .iter()
            .filter(|f| is_script(&f.path))
            .map(|f| Measurement {
                label: f.path.clone(),
                size: f.size(),
            })
            .collect(),
        BudgetType::Any => browser
            .iter()
            .map(|f| Measurement {
                label: f.path.clone(),
                size: f.size(),
            })
            .collect(),
        BudgetType::Bundle => {
            let Some(name) = &budget.name else {
                return Vec::new();
            };
            initial_files
                .get(name)
                .and_then(|initial| browser.iter().find(|f| f.path == initial.file))
                .map(|f| Measurement {
                    label: name.clone(),
                    size: f.size(),
                })
                .into_iter()
                .collect()
        }
    }
}

/// Evaluate every budget against the final file set.
pub fn check_budgets(
    budgets: &[Budget],
    files: &[&OutputFile],
    initial_files: &FxHashMap<String, InitialFile>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for budget in budgets {
        let thresholds = [
            (&budget.maximum_error, true, true),
            (&budget.maximum_warning, true, false),
            (&budget.minimum_error, false, true),
            (&budget.minimum_warning, false, false),
        ];
        for measurement in measure(budget, files, initial_files) {
            for (threshold, is_maximum, is_error) in &thresholds {
                let Some(raw) = threshold else { continue };
                let Some(limit) = parse_size(raw) else {
                    diagnostics.push(Diagnostic::error(format!(
                        "Invalid budget size '{}'",
                        raw
                    )));
                    continue;
                };
                let exceeded = if *is_maximum {
                    measurement.size > limit
                } else {
                    measurement.size < limit
                };
                if !exceeded {
                    continue;
                }
                let relation = if *is_maximum { "exceeded maximum" } else { "failed to meet minimum" };
                let message = format!(
                    "{} {} budget: {} bytes (budget {})",
                    measurement.label, relation, measurement.size, raw
                );
                diagnostics.push(if *is_error {
                    Diagnostic::error(message)
                } else {
                    Diagnostic::warning(message)
                });
                // Report only the most severe violated threshold per
                // direction.
                break;
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::InitialFileKind;

    fn initial_map(entries: &[(&str, &str)]) -> FxHashMap<String, InitialFile> {
        entries
            .iter()
            .map(|(name, file)| {
                (
                    name.to_string(),
                    InitialFile {
                        file: file.to_string(),
                        name: name.to_string(),
                        kind: InitialFileKind::Script,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn parse_size_accepts_units_and_fractions() {
        assert_eq!(parse_size("500kb"), Some(512_000));
        assert_eq!(parse_size("1.5mb"), Some(1_572_864));
        assert_eq!(parse_size("120000"), Some(120_000));
        assert_eq!(parse_size("12b"), Some(12));
        assert_eq!(parse_size("oops"), None);
    }

    #[test]
    fn initial_budget_sums_only_initial_files() {
        let main = OutputFile::new("main.js", vec![0; 600], OutputFileType::Browser);
        let lazy = OutputFile::new("admin.js", vec![0; 10_000], OutputFileType::Browser);
        let files = vec![&main, &lazy];
        let initials = initial_map(&[("main", "main.js")]);

        let budgets = [Budget {
            budget_type: BudgetType::Initial,
            name: None,
            maximum_warning: Some("500b".into()),
            maximum_error: None,
            minimum_warning: None,
            minimum_error: None,
        }];
        let diagnostics = check_budgets(&budgets, &files, &initials);
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
        assert!(diagnostics[0].message.contains("600 bytes"));
    }

    #[test]
    fn error_threshold_takes_precedence_over_warning() {
        let main = OutputFile::new("main.js", vec![0; 2048], OutputFileType::Browser);
        let files = vec![&main];
        let budgets = [Budget {
            budget_type: BudgetType::AnyScript,
            name: None,
            maximum_warning: Some("1kb".into()),
            maximum_error: Some("1.5kb".into()),
            minimum_warning: None,
            minimum_error: None,
        }];
        let diagnostics = check_budgets(&budgets, &files, &Default::default());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].is_error());
    }

    #[test]
    fn within_budget_reports_nothing() {
        let main = OutputFile::new("main.js", vec![0; 100], OutputFileType::Browser);
        let files = vec![&main];
        let budgets = [Budget {
            budget_type: BudgetType::All,
            name: None,
            maximum_warning: Some("1kb".into()),
            maximum_error: None,
            minimum_warning: None,
            minimum_error: None,
        }];
        assert!(check_budgets(&budgets, &files, &Default::default()).is_empty());
    }

    #[test]
    fn sourcemaps_are_excluded_from_measurements() {
        let map = OutputFile::new("main.js.map", vec![0; 50_000], OutputFileType::Browser);
        let files = vec![&map];
        let budgets = [Budget {
            budget_type: BudgetType::All,
            name: None,
            maximum_error: Some("1kb".into()),
            maximum_warning: None,
            minimum_warning: None,
            minimum_error: None,
        }];
        assert!(check_budgets(&budgets, &files, &Default::default()).is_empty());
    }
}
