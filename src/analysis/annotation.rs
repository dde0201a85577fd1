//! Structured header comments.
//!
//! ```text
//! # @shape
//! # name: billing
//! # in: [invoice, customer]
//! # deps: stripe
//! # @end
//! ```
//!
//! Any of `#`, `//`, `/*`, `*`, `<!--` may open each line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token on the line that opens a block.
pub const OPEN_MARKER: &str = "@shape";

/// Content of the line that closes a block.
pub const CLOSE_MARKER: &str = "@end";

const COMMENT_PREFIXES: &[&str] = &["<!--", "/**", "/*", "//", "#", "*"];
const COMMENT_SUFFIXES: &[&str] = &["-->", "*/"];

/// Parsed annotation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Every key/value pair in the block, recognised or not.
    pub raw: BTreeMap<String, String>,
}

/// Locate and parse the first annotation block. `None` when there is none or
/// it is never closed.
pub fn read_annotation(lines: &[&str]) -> Option<AnnotationBlock> {
    let start = lines.iter().position(|l| is_open_line(l))?;
    let mut block = AnnotationBlock::default();

    for line in &lines[start + 1..] {
        let content = comment_content(line);
        if content == CLOSE_MARKER {
            return Some(block);
        }
        let Some((key, value)) = content.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key.is_empty() {
            continue;
        }
        block.raw.insert(key.clone(), value.to_string());

        match key.as_str() {
            "name" => block.name = Some(value.to_string()),
            "type" => block.type_name = Some(value.to_string()),
            "desc" => block.desc = Some(value.to_string()),
            "in" | "inputs" => block.inputs = parse_list(value),
            "out" | "outputs" => block.outputs = parse_list(value),
            "deps" => block.deps = parse_list(value),
            "methods" => block.methods = parse_list(value),
            "errors" => block.errors = parse_list(value),
            _ => {}
        }
    }
    None
}

fn is_open_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        && comment_content(line).starts_with(OPEN_MARKER)
}

/// Line text with comment delimiters removed.
fn comment_content(line: &str) -> &str {
    let mut text = line.trim();
    for prefix in COMMENT_PREFIXES {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim_start();
            break;
        }
    }
    for suffix in COMMENT_SUFFIXES {
        if let Some(rest) = text.strip_suffix(suffix) {
            text = rest.trim_end();
            break;
        }
    }
    text.trim()
}

/// `[a, b, c]` or a single bare value.
fn parse_list(value: &str) -> Vec<String> {
    let inner = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        Some(inner) => inner,
        None => value,
    };
    inner
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
