//! Unreferenced imports, callables, and private module constants.
//!
//! All searches run on the stripped copy of the file, so a name that only
//! appears inside a string literal or a comment counts as unreferenced.

use regex::Regex;

use super::strip::Stripped;
use super::types::{UnusedItem, UnusedKind};
use crate::analysis::FileFacts;

/// Constructor names across the supported languages; never reported.
const CONSTRUCTOR_NAMES: &[&str] = &["__init__", "__new__", "constructor", "__construct"];

/// Imported names that are consumed by tooling rather than executable code.
const ANNOTATION_ONLY_NAMES: &[&str] = &[
    "annotations",
    "TYPE_CHECKING",
    "React",
    "h",
    "Fragment",
    "jsx",
];

/// Find unreferenced symbols in a file.
pub fn detect_unused(stripped: &Stripped, facts: &FileFacts) -> Vec<UnusedItem> {
    let mut unused = Vec::new();
    unused_imports(stripped, facts, &mut unused);
    unused_callables(stripped, facts, &mut unused);
    unused_private_globals(stripped, facts, &mut unused);
    unused.sort_by_key(|u| u.line_number);
    unused
}

fn unused_imports(stripped: &Stripped, facts: &FileFacts, out: &mut Vec<UnusedItem>) {
    let text = joined(stripped, |line_number| !facts.import_lines.contains(&line_number));

    for import in &facts.imports {
        for name in &import.names {
            // `import os.path` binds `os`.
            let bound = name.split('.').next().unwrap_or(name);
            if bound == "*"
                || bound.chars().count() <= 1
                || ANNOTATION_ONLY_NAMES.contains(&bound)
                || !is_identifier(bound)
            {
                continue;
            }
            if !word_regex(bound).map_or(true, |re| re.is_match(&text)) {
                out.push(UnusedItem {
                    name: name.clone(),
                    kind: UnusedKind::Import,
                    line_number: import.line_number,
                });
            }
        }
    }
}

fn unused_callables(stripped: &Stripped, facts: &FileFacts, out: &mut Vec<UnusedItem>) {
    let headerless = joined(stripped, |line_number| !facts.header_lines.contains(&line_number));

    for callable in facts.all_callables() {
        let name = callable.name.as_str();
        if CONSTRUCTOR_NAMES.contains(&name) || is_dunder(name) || !is_identifier(name) {
            continue;
        }
        let escaped = regex::escape(name);
        let Ok(call_re) = Regex::new(&format!(
            r"(?:\b(?:self|this|cls|static|parent)\s*(?:\.|->|::)\s*)?\b{escaped}\s*\("
        )) else {
            continue;
        };
        let own_header_excluded = joined(stripped, |line_number| line_number != callable.line_number);
        if call_re.is_match(&own_header_excluded) {
            continue;
        }
        if word_regex(name).map_or(true, |re| re.is_match(&headerless)) {
            continue;
        }
        out.push(UnusedItem {
            name: name.to_string(),
            kind: UnusedKind::Callable,
            line_number: callable.line_number,
        });
    }
}

/// Module constants named with a leading underscore are file-private.
fn unused_private_globals(stripped: &Stripped, facts: &FileFacts, out: &mut Vec<UnusedItem>) {
    for (global, &line_number) in facts.globals.iter().zip(&facts.global_lines) {
        let name = global.name.as_str();
        if !name.starts_with('_') || is_dunder(name) {
            continue;
        }
        let text = joined(stripped, |n| n != line_number);
        if !word_regex(name).map_or(true, |re| re.is_match(&text)) {
            out.push(UnusedItem {
                name: name.to_string(),
                kind: UnusedKind::Variable,
                line_number,
            });
        }
    }
}

/// Stripped code of every line (1-indexed) accepted by `keep`, newline-joined.
fn joined(stripped: &Stripped, keep: impl Fn(usize) -> bool) -> String {
    stripped
        .code
        .iter()
        .enumerate()
        .filter(|(idx, _)| keep(idx + 1))
        .map(|(_, line)| line.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn word_regex(name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(name))).ok()
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}
