//! Diagnostic value types.
//!
//! Compile and bundle problems are data, not control flow: every stage
//! accumulates `Diagnostic` values into plain lists threaded through
//! return values. Only programmer/configuration faults become
//! [`crate::Error`].

use serde::{Deserialize, Serialize};

/// Severity of a build diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A single build diagnostic with optional source location context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source file the diagnostic refers to, when known.
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            file: None,
            line: None,
            column: None,
        }
    }

    /// Attach a source file location.
    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => {
                write!(f, "{}:{}:{} - {}", file, line, column, self.message)
            }
            (Some(file), _, _) => write!(f, "{} - {}", file, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Partition a diagnostic list into (errors, warnings).
pub fn partition(diagnostics: &[Diagnostic]) -> (Vec<&Diagnostic>, Vec<&Diagnostic>) {
    diagnostics.iter().partition(|d| d.is_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_when_present() {
        let diag = Diagnostic::error("unexpected token").with_location("src/app.ts", 12, 4);
        assert_eq!(diag.to_string(), "src/app.ts:12:4 - unexpected token");
    }

    #[test]
    fn display_without_location() {
        let diag = Diagnostic::warning("something odd");
        assert_eq!(diag.to_string(), "something odd");
    }

    #[test]
    fn partition_splits_by_severity() {
        let list = vec![
            Diagnostic::error("e1"),
            Diagnostic::warning("w1"),
            Diagnostic::error("e2"),
        ];
        let (errors, warnings) = partition(&list);
        assert_eq!(errors.len(), 2);
        assert_eq!(warnings.len(), 1);
    }
}
