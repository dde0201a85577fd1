//! Cross-file references to a file's public symbols.
//!
//! Candidate files are enumerated with walkdir, capped, and searched in
//! parallel. A file that cannot be read is skipped.

use rayon::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::strip::strip_source;
use super::types::ExternalUsage;
use crate::analysis::{Language, StructuralSummary};

/// Directories never searched.
pub const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "venv",
    ".venv",
    "__pycache__",
    "dist",
    "build",
];

/// Symbols shorter than this are too common to search for.
const MIN_SYMBOL_LEN: usize = 3;

/// Public symbols of a summary: non-private top-level callables, types, and globals.
pub fn public_symbols(summary: &StructuralSummary) -> Vec<String> {
    let mut symbols: Vec<String> = summary
        .callables
        .iter()
        .filter(|c| !c.is_private)
        .map(|c| c.name.clone())
        .chain(
            summary
                .types
                .iter()
                .filter(|_| summary.language != Language::Html)
                .map(|t| t.name.clone()),
        )
        .chain(summary.globals.iter().map(|g| g.name.clone()))
        .filter(|s| {
            s.chars().count() >= MIN_SYMBOL_LEN
                && !s.starts_with('_')
                && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Find other files under `root` that reference the public symbols of `file`.
pub fn find_external_usages(
    file: &Path,
    root: &Path,
    summary: &StructuralSummary,
    max_files: usize,
) -> Vec<ExternalUsage> {
    let symbols = public_symbols(summary);
    if symbols.is_empty() || max_files == 0 {
        return Vec::new();
    }
    let alternation = symbols
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = match Regex::new(&format!(r"\b({alternation})\b")) {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!("usage pattern rejected: {}", e);
            return Vec::new();
        }
    };

    let own = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let candidates = candidate_files(root, &own, max_files);
    tracing::debug!(
        "searching {} files under {} for {} symbols",
        candidates.len(),
        root.display(),
        symbols.len()
    );

    let mut usages: Vec<ExternalUsage> = candidates
        .par_iter()
        .flat_map_iter(|(path, language)| search_file(path, *language, root, &pattern))
        .collect();
    usages.sort();
    usages
}

/// Supported files under `root`, excluding `own`, at most `max_files`.
fn candidate_files(root: &Path, own: &Path, max_files: usize) -> Vec<(PathBuf, Language)> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir()
                && e.depth() > 0
                && (name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())))
        })
        .filter_map(|entry| entry.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let language = Language::from_path(e.path())?;
            let path = e.path().canonicalize().unwrap_or_else(|_| e.path().to_path_buf());
            (path != own).then_some((e.path().to_path_buf(), language))
        })
        .take(max_files)
        .collect()
}

/// First referencing line of each symbol in one file.
fn search_file(path: &Path, language: Language, root: &Path, pattern: &Regex) -> Vec<ExternalUsage> {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!("skipping {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    let lines: Vec<&str> = source.lines().collect();
    let stripped = strip_source(&lines, language);
    let display = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    let mut seen: Vec<&str> = Vec::new();
    let mut found = Vec::new();
    for (idx, line) in stripped.code.iter().enumerate() {
        for m in pattern.find_iter(line) {
            let symbol = m.as_str();
            if seen.contains(&symbol) {
                continue;
            }
            seen.push(symbol);
            found.push(ExternalUsage {
                symbol: symbol.to_string(),
                file: display.clone(),
                line_number: idx + 1,
            });
        }
    }
    found
}
