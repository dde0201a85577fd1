//! One-line human-readable summary of a structural summary.

use crate::analysis::StructuralSummary;

/// Build the overview sentence for a summary.
pub fn summarize(summary: &StructuralSummary) -> String {
    let mut parts = Vec::new();

    let subject = match &summary.annotation {
        Some(a) => match (&a.name, &a.desc) {
            (Some(name), Some(desc)) => format!("{name} ({desc}):"),
            (Some(name), None) => format!("{name}:"),
            (None, Some(desc)) => format!("{desc}:"),
            (None, None) => String::new(),
        },
        None => String::new(),
    };

    let methods: usize = summary.types.iter().map(|t| t.methods.len()).sum();
    let mut shape = format!(
        "{} file with {}, {}",
        summary.language.as_str(),
        plural(summary.types.len(), "type"),
        plural(summary.callables.len() + methods, "callable"),
    );
    if methods > 0 {
        shape.push_str(&format!(" ({methods} in types)"));
    }
    shape.push_str(&format!(" and {}", plural(summary.imports.len(), "import")));
    parts.push(shape);

    let busiest = summary
        .callables
        .iter()
        .chain(summary.types.iter().flat_map(|t| t.methods.iter()))
        .max_by_key(|c| (c.complexity, std::cmp::Reverse(c.line_number)));
    if let Some(c) = busiest.filter(|c| c.complexity > 0) {
        parts.push(format!("most complex: {} ({})", c.name, c.complexity));
    }

    let mut findings = Vec::new();
    if !summary.hardcoded.is_empty() {
        findings.push(plural(summary.hardcoded.len(), "hardcoded value"));
    }
    if !summary.unused.is_empty() {
        findings.push(plural(summary.unused.len(), "unused symbol"));
    }
    if !summary.markers.is_empty() {
        findings.push(plural(summary.markers.len(), "marker"));
    }
    if !findings.is_empty() {
        parts.push(findings.join(", "));
    }

    let body = parts.join("; ");
    if subject.is_empty() {
        format!("{body}.")
    } else {
        format!("{subject} {body}.")
    }
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
