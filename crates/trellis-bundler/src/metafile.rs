//! Dependency-graph summary produced by bundling.
//!
//! The metafile maps input modules to output chunks with byte sizes. It
//! is produced once per build by the bundler collaborator and consumed
//! by the CommonJS checker, budget checker, stats writer, license
//! extractor, and transfer-size estimator.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// Module system of an input file, as detected during bundling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Esm,
    Cjs,
    Css,
}

/// One input module entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetafileInput {
    pub bytes: u64,
    /// Paths of modules this input imports.
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ModuleFormat>,
}

/// One output chunk entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetafileOutput {
    pub bytes: u64,
    /// Contributing input modules with their byte contribution.
    #[serde(default)]
    pub inputs: FxHashMap<String, u64>,
    /// Entry point module when this chunk is entry-driven.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

/// Structural summary of which inputs produced which output chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metafile {
    pub inputs: FxHashMap<String, MetafileInput>,
    pub outputs: FxHashMap<String, MetafileOutput>,
}

impl Metafile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union-merge another metafile fragment into this one.
    ///
    /// Two contexts claiming the same output chunk name signals a
    /// configuration bug; it is reported as a diagnostic rather than a
    /// panic so the orchestrator can surface it alongside other build
    /// errors. Duplicate input entries are benign (shared modules) and
    /// keep the first record.
    pub fn merge(&mut self, other: Metafile) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (path, input) in other.inputs {
            self.inputs.entry(path).or_insert(input);
        }

        for (chunk, output) in other.outputs {
            if self.outputs.contains_key(&chunk) {
                diagnostics.push(Diagnostic::error(format!(
                    "Duplicate output chunk '{}' produced by multiple bundling contexts",
                    chunk
                )));
                continue;
            }
            self.outputs.insert(chunk, output);
        }

        diagnostics
    }

    /// Serialize for the `stats.json` debug artifact.
    pub fn to_stats_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(bytes: u64) -> MetafileOutput {
        MetafileOutput {
            bytes,
            ..Default::default()
        }
    }

    #[test]
    fn merge_unions_disjoint_outputs() {
        let mut a = Metafile::new();
        a.outputs.insert("main.js".into(), chunk(100));
        let mut b = Metafile::new();
        b.outputs.insert("styles.css".into(), chunk(50));

        let diagnostics = a.merge(b);
        assert!(diagnostics.is_empty());
        assert_eq!(a.outputs.len(), 2);
    }

    #[test]
    fn merge_reports_duplicate_chunk_names() {
        let mut a = Metafile::new();
        a.outputs.insert("main.js".into(), chunk(100));
        let mut b = Metafile::new();
        b.outputs.insert("main.js".into(), chunk(200));

        let diagnostics = a.merge(b);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("main.js"));
        // The first writer's entry survives.
        assert_eq!(a.outputs["main.js"].bytes, 100);
    }

    #[test]
    fn merge_keeps_first_input_record_for_shared_modules() {
        let mut a = Metafile::new();
        a.inputs.insert(
            "src/shared.ts".into(),
            MetafileInput {
                bytes: 10,
                ..Default::default()
            },
        );
        let mut b = Metafile::new();
        b.inputs.insert(
            "src/shared.ts".into(),
            MetafileInput {
                bytes: 99,
                ..Default::default()
            },
        );

        a.merge(b);
        assert_eq!(a.inputs["src/shared.ts"].bytes, 10);
    }
}
