//! Language tags and the per-language extractor table.
//!
//! Every extractor is a plain function with the same contract: raw lines in,
//! [`FileFacts`] out. Selection goes through a static lookup keyed by
//! [`Language`]; unknown tags are routed to the JavaScript extractor.

pub mod html;
mod javascript;
mod php;
mod python;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::facts::FileFacts;

pub use javascript::extract_script;

/// Supported language tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Php,
    Html,
    Unknown,
}

/// Package ecosystem used for dependency resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Pip,
    Npm,
    Composer,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Pip => "pip",
            Ecosystem::Npm => "npm",
            Ecosystem::Composer => "composer",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Language {
    /// Resolve a user-facing tag. Never fails; unrecognised tags are `Unknown`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Language::Python,
            "javascript" | "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "typescript" | "ts" | "tsx" | "mts" => Language::TypeScript,
            "php" => Language::Php,
            "html" | "htm" => Language::Html,
            _ => Language::Unknown,
        }
    }

    /// Language of a file path, `None` for unsupported extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match Self::from_tag(ext) {
            Language::Unknown => None,
            lang => Some(lang),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Php => "php",
            Language::Html => "html",
            Language::Unknown => "unknown",
        }
    }

    pub fn ecosystem(&self) -> Option<Ecosystem> {
        match self {
            Language::Python => Some(Ecosystem::Pip),
            Language::JavaScript | Language::TypeScript | Language::Unknown => Some(Ecosystem::Npm),
            Language::Php => Some(Ecosystem::Composer),
            Language::Html => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extractor contract shared by all language families.
pub type Extractor = fn(&[&str]) -> FileFacts;

static EXTRACTORS: Lazy<HashMap<Language, Extractor>> = Lazy::new(|| {
    let mut table: HashMap<Language, Extractor> = HashMap::new();
    table.insert(Language::Python, python::extract);
    table.insert(Language::JavaScript, javascript::extract_javascript);
    table.insert(Language::TypeScript, javascript::extract_typescript);
    table.insert(Language::Php, php::extract);
    table.insert(Language::Html, html::extract);
    table
});

/// Extractor for a language, falling back to the JavaScript extractor.
pub fn extractor_for(language: Language) -> Extractor {
    EXTRACTORS
        .get(&language)
        .copied()
        .unwrap_or(javascript::extract_javascript)
}

/// File extensions accepted by directory scans.
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "php", "html", "htm",
    ]
}
