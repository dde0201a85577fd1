//! Codeshape - heuristic structural summaries of source files.
//!
//! Codeshape reads a single file's text and produces a [`StructuralSummary`]:
//! imports, type-like declarations, callables with a branch-complexity count,
//! suspicious hardcoded literals, unreferenced symbols and marker comments.
//! No compiler or syntax tree is involved; every language family is handled by
//! line-oriented extractors with depth and indentation counters.
//!
//! # Architecture
//!
//! - `analysis`: per-language extractors, annotation blocks, fact types
//! - `detect`: stripping, findings, dependency resolution, cross-file usages
//! - `verify`: live dependency checks through external commands
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```
//! use codeshape::{analyze, analysis::Language};
//!
//! let summary = analyze("def greet(name):\n    return name\n", Language::Python);
//! assert_eq!(summary.callables[0].name, "greet");
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod report;
pub mod verify;

pub use analysis::{FileFacts, Language, StructuralSummary};
pub use config::Config;
pub use detect::{FileReport, Runner};

use analysis::{extractor_for, read_annotation};
use detect::{detect_hardcoded, detect_markers, detect_unused, strip_source, summarize};

/// Analyse source text with the default configuration.
pub fn analyze(source: &str, language: Language) -> StructuralSummary {
    analyze_with(source, language, &Config::default())
}

/// Analyse source text.
///
/// Pure: no filesystem access. Dependency issues and external usages are
/// left empty; [`Runner`] fills them for files on disk.
pub fn analyze_with(source: &str, language: Language, config: &Config) -> StructuralSummary {
    let lines: Vec<&str> = source.lines().collect();

    let annotation = read_annotation(&lines);
    let facts = extractor_for(language)(&lines);
    let stripped = strip_source(&lines, language);

    let hardcoded = detect_hardcoded(&lines, &stripped, &facts.import_lines, &config.hardcoded);
    let unused = if config.unused.enabled {
        detect_unused(&stripped, &facts)
    } else {
        Vec::new()
    };
    let markers = if config.markers.enabled {
        detect_markers(&stripped)
    } else {
        Vec::new()
    };

    let mut connections: Vec<String> = Vec::new();
    for import in &facts.imports {
        let module = import.module.trim();
        if !module.is_empty() && !connections.iter().any(|c| c == module) {
            connections.push(module.to_string());
        }
    }

    let mut summary = StructuralSummary {
        language,
        annotation,
        imports: facts.imports,
        types: facts.types,
        callables: facts.callables,
        globals: facts.globals,
        total_lines: lines.len(),
        code_lines: stripped.code_line_count(),
        connections,
        error_type_names: facts.error_names,
        risk_point_lines: facts.risk_points,
        hardcoded,
        unused,
        markers,
        overview: String::new(),
        dependency_issues: Vec::new(),
        external_usages: Vec::new(),
    };
    summary.overview = summarize(&summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{HardcodedKind, UnusedKind};

    #[test]
    fn test_code_lines_never_exceed_total() {
        let src = "# comment\n\nimport os\n'''doc\nstring'''\nx = os.sep\n";
        let summary = analyze(src, Language::Python);
        assert_eq!(summary.total_lines, 6);
        assert!(summary.code_lines <= summary.total_lines);
        assert_eq!(summary.connections, vec!["os"]);
    }

    #[test]
    fn test_toggles_disable_findings() {
        let src = "import os\npassword = \"s3cr3t123\"\n# TODO: rotate\n";
        let mut config = Config::default();
        config.hardcoded.enabled = false;
        config.unused.enabled = false;
        config.markers.enabled = false;
        let summary = analyze_with(src, Language::Python, &config);
        assert!(summary.hardcoded.is_empty());
        assert!(summary.unused.is_empty());
        assert!(summary.markers.is_empty());

        let summary = analyze(src, Language::Python);
        assert_eq!(summary.hardcoded[0].kind, HardcodedKind::Credential);
        assert_eq!(summary.unused[0].kind, UnusedKind::Import);
        assert_eq!(summary.markers.len(), 1);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let src = "import React from 'react';\nexport class Cart {\n  total() { return this.items ? 1 : 0; }\n}\n";
        let a = serde_json::to_string(&analyze(src, Language::TypeScript)).unwrap();
        let b = serde_json::to_string(&analyze(src, Language::TypeScript)).unwrap();
        assert_eq!(a, b);
    }
}
