//! Fact structures extracted from raw source lines.
//!
//! Every `line_number` is 1-indexed and refers to the unmodified input text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::annotation::AnnotationBlock;
use super::languages::Language;
use crate::detect::{DependencyIssue, ExternalUsage, HardcodedValue, MarkerComment, UnusedItem};

/// Type sentinel used when a slot has no statically declared type.
pub const UNKNOWN_TYPE: &str = "any";

/// A parameter or attribute slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: UNKNOWN_TYPE.to_string(),
            default: None,
        }
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        let t = type_name.into();
        if !t.trim().is_empty() {
            self.type_name = t.trim().to_string();
        }
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        let d = default.into();
        if !d.trim().is_empty() {
            self.default = Some(d.trim().to_string());
        }
        self
    }
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Callable {
    pub name: String,
    pub params: Vec<Port>,
    pub return_type: String,
    pub decorators: Vec<String>,
    pub line_number: usize,
    pub is_async: bool,
    pub is_private: bool,
    /// Number of branch-introducing constructs inside the body span.
    pub complexity: usize,
}

impl Callable {
    pub fn new(name: impl Into<String>, line_number: usize) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: UNKNOWN_TYPE.to_string(),
            decorators: Vec::new(),
            line_number,
            is_async: false,
            is_private: false,
            complexity: 0,
        }
    }
}

/// A class-like declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDecl {
    pub name: String,
    pub bases: Vec<String>,
    pub methods: Vec<Callable>,
    pub attributes: Vec<Port>,
    pub decorators: Vec<String>,
    pub line_number: usize,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, line_number: usize) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            decorators: Vec::new(),
            line_number,
        }
    }

    /// Add an attribute unless one with the same name is already present.
    pub fn add_attribute(&mut self, port: Port) {
        if !self.attributes.iter().any(|a| a.name == port.name) {
            self.attributes.push(port);
        }
    }
}

/// An import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDecl {
    pub module: String,
    /// Names bound in the importing file.
    pub names: Vec<String>,
    /// True for "import named members from module", false for whole-module imports.
    pub is_from: bool,
    pub line_number: usize,
}

/// Raw output of a language extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFacts {
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub callables: Vec<Callable>,
    pub globals: Vec<Port>,
    pub error_names: Vec<String>,
    pub risk_points: Vec<usize>,
    /// Every line (1-indexed) covered by an import statement, including continuations.
    pub import_lines: BTreeSet<usize>,
    /// Header lines of every callable declaration.
    pub header_lines: BTreeSet<usize>,
    /// Line numbers of module-level constants.
    pub global_lines: Vec<usize>,
}

impl FileFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an error type name once, in first-seen order.
    pub fn add_error_name(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.error_names.iter().any(|n| n == name) {
            self.error_names.push(name.to_string());
        }
    }

    /// Record an exception-handling line.
    pub fn add_risk_point(&mut self, line_number: usize) {
        if !self.risk_points.contains(&line_number) {
            self.risk_points.push(line_number);
        }
    }

    /// Record the (1-indexed, inclusive) header span of a callable declaration.
    pub fn note_header(&mut self, first: usize, last: usize) {
        self.header_lines.extend(first..=last.max(first));
    }

    /// Record the (1-indexed, inclusive) span of an import statement.
    pub fn note_import(&mut self, first: usize, last: usize) {
        self.import_lines.extend(first..=last.max(first));
    }

    /// Every callable, top-level functions first, then methods in declaration order.
    pub fn all_callables(&self) -> impl Iterator<Item = &Callable> {
        self.callables
            .iter()
            .chain(self.types.iter().flat_map(|t| t.methods.iter()))
    }

    /// Sort list fields so repeated runs produce identical output.
    pub fn finish(mut self) -> Self {
        self.imports.sort_by_key(|i| i.line_number);
        self.types.sort_by_key(|t| t.line_number);
        self.callables.sort_by_key(|c| c.line_number);
        self.risk_points.sort_unstable();
        self
    }
}

/// The complete per-file extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSummary {
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<AnnotationBlock>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub callables: Vec<Callable>,
    pub globals: Vec<Port>,
    pub total_lines: usize,
    /// Non-blank, non-comment, non-docstring lines.
    pub code_lines: usize,
    /// Flattened import identifiers.
    pub connections: Vec<String>,
    pub error_type_names: Vec<String>,
    pub risk_point_lines: Vec<usize>,
    pub hardcoded: Vec<HardcodedValue>,
    pub unused: Vec<UnusedItem>,
    pub markers: Vec<MarkerComment>,
    pub overview: String,
    #[serde(default)]
    pub dependency_issues: Vec<DependencyIssue>,
    #[serde(default)]
    pub external_usages: Vec<ExternalUsage>,
}

impl StructuralSummary {
    /// Number of callables including methods.
    pub fn callable_count(&self) -> usize {
        self.callables.len() + self.types.iter().map(|t| t.methods.len()).sum::<usize>()
    }

    /// Whether any informational finding is attached.
    pub fn has_findings(&self) -> bool {
        !self.hardcoded.is_empty()
            || !self.unused.is_empty()
            || self
                .dependency_issues
                .iter()
                .any(|d| d.status == crate::detect::DependencyStatus::Missing)
    }
}
