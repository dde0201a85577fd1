//! Output formatting for analysis results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the serialized summaries for programmatic consumption

use colored::*;
use serde::Serialize;
use std::fmt::Write as _;

use crate::analysis::StructuralSummary;
use crate::detect::{DependencyStatus, FileReport};

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON document.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub files_analyzed: usize,
    pub files: Vec<JsonFile<'a>>,
}

/// One analysed file: its summary, or the error that prevented analysis.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFile<'a> {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<&'a StructuralSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build the JSON document.
pub fn render_json(path: &str, config_path: Option<&str>, reports: &[FileReport]) -> anyhow::Result<String> {
    let files: Vec<JsonFile> = reports
        .iter()
        .map(|r| JsonFile {
            path: r.path.to_string_lossy().to_string(),
            summary: r.result.as_ref().ok(),
            error: r.result.as_ref().err().map(|e| e.to_string()),
        })
        .collect();

    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        path: path.to_string(),
        config: config_path.map(str::to_string),
        files_analyzed: reports.iter().filter(|r| r.result.is_ok()).count(),
        files,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Write results in JSON format.
pub fn write_json(path: &str, config_path: Option<&str>, reports: &[FileReport]) -> anyhow::Result<()> {
    println!("{}", render_json(path, config_path, reports)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty format.
pub fn write_pretty(path: &str, config_path: Option<&str>, reports: &[FileReport]) {
    print!("{}", render_pretty(path, config_path, reports));
}

/// Build the pretty, colored text.
pub fn render_pretty(path: &str, config_path: Option<&str>, reports: &[FileReport]) -> String {
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} {}", "codeshape".bold(), path);
    if let Some(cfg) = config_path {
        let _ = writeln!(out, "  {}", format!("config: {}", cfg).dimmed());
    }
    let _ = writeln!(out);

    for report in reports {
        let name = report.path.to_string_lossy();
        match &report.result {
            Ok(summary) => write_summary(&mut out, &name, summary),
            Err(e) => {
                let _ = writeln!(out, "  {} {}", "ERROR".red(), name.blue());
                let _ = writeln!(out, "            {}", e);
                let _ = writeln!(out);
            }
        }
    }

    let failed = reports.iter().filter(|r| r.result.is_err()).count();
    let findings: usize = reports
        .iter()
        .filter_map(|r| r.result.as_ref().ok())
        .map(finding_count)
        .sum();
    let _ = write!(out, "  {} file(s) analysed", reports.len() - failed);
    if failed > 0 {
        let _ = write!(out, ", {}", format!("{} failed", failed).red());
    }
    if findings > 0 {
        let _ = write!(out, ", {}", format!("{} finding(s)", findings).yellow());
    } else {
        let _ = write!(out, ", {}", "no findings".green());
    }
    let _ = writeln!(out);
    let _ = writeln!(out);
    out
}

fn finding_count(summary: &StructuralSummary) -> usize {
    summary.hardcoded.len()
        + summary.unused.len()
        + summary
            .dependency_issues
            .iter()
            .filter(|d| d.status == DependencyStatus::Missing)
            .count()
}

fn write_summary(out: &mut String, name: &str, s: &StructuralSummary) {
    let _ = writeln!(out, "  {} {}", name.blue().bold(), format!("[{}]", s.language).dimmed());
    let _ = writeln!(out, "    {}", s.overview);
    let _ = writeln!(
        out,
        "    {}",
        format!("{} lines, {} code", s.total_lines, s.code_lines).dimmed()
    );
    let _ = writeln!(out);

    write_structure(out, s);
    write_findings(out, s);
    write_dependencies(out, s);
    write_markers(out, s);
}

fn write_structure(out: &mut String, s: &StructuralSummary) {
    if s.imports.is_empty() && s.types.is_empty() && s.callables.is_empty() {
        return;
    }
    let _ = writeln!(out, "    {}", "Structure:".bold());
    if !s.connections.is_empty() {
        let _ = writeln!(out, "      imports    {}", s.connections.join(", "));
    }
    for t in &s.types {
        let bases = if t.bases.is_empty() {
            String::new()
        } else {
            format!("({})", t.bases.join(", "))
        };
        let _ = writeln!(
            out,
            "      type       {}{} {}",
            t.name.cyan(),
            bases,
            format!(":{}", t.line_number).dimmed()
        );
        for m in &t.methods {
            let _ = writeln!(
                out,
                "        method   {} {} {}",
                m.name,
                format!("cx={}", m.complexity).dimmed(),
                format!(":{}", m.line_number).dimmed()
            );
        }
    }
    for c in &s.callables {
        let _ = writeln!(
            out,
            "      callable   {} {} {}",
            c.name,
            format!("cx={}", c.complexity).dimmed(),
            format!(":{}", c.line_number).dimmed()
        );
    }
    if !s.error_type_names.is_empty() {
        let _ = writeln!(out, "      errors     {}", s.error_type_names.join(", "));
    }
    let _ = writeln!(out);
}

fn write_findings(out: &mut String, s: &StructuralSummary) {
    if s.hardcoded.is_empty() && s.unused.is_empty() {
        return;
    }
    let _ = writeln!(out, "    {} ({}):", "Findings".bold(), s.hardcoded.len() + s.unused.len());
    for h in &s.hardcoded {
        let _ = writeln!(
            out,
            "      {} {:<11}{} {}",
            "WARN ".yellow(),
            h.kind.as_str(),
            h.value,
            format!("{} :{}", h.context, h.line_number).dimmed()
        );
    }
    for u in &s.unused {
        let _ = writeln!(
            out,
            "      {} {:<11}{} {}",
            "INFO ".blue(),
            format!("unused {}", u.kind.as_str()),
            u.name,
            format!(":{}", u.line_number).dimmed()
        );
    }
    let _ = writeln!(out);
}

fn write_dependencies(out: &mut String, s: &StructuralSummary) {
    if s.dependency_issues.is_empty() {
        return;
    }
    let _ = writeln!(out, "    {}", "Dependencies:".bold());
    for d in &s.dependency_issues {
        let tag = match d.status {
            DependencyStatus::Installed => "ok     ".green(),
            DependencyStatus::Missing => "missing".red(),
            DependencyStatus::Unknown => "unknown".dimmed(),
        };
        let _ = write!(out, "      {} {} {}", tag, d.name, format!(":{}", d.line_number).dimmed());
        if let Some(hint) = &d.install_hint {
            let _ = write!(out, "  {}", hint.dimmed());
        }
        let _ = writeln!(out);
    }
    if !s.external_usages.is_empty() {
        let _ = writeln!(out, "    {}", "Used by:".bold());
        for u in &s.external_usages {
            let _ = writeln!(
                out,
                "      {} {}",
                u.symbol,
                format!("{}:{}", u.file, u.line_number).dimmed()
            );
        }
    }
    let _ = writeln!(out);
}

fn write_markers(out: &mut String, s: &StructuralSummary) {
    if s.markers.is_empty() {
        return;
    }
    let _ = writeln!(out, "    {}", "Markers:".bold());
    for m in &s.markers {
        let _ = writeln!(
            out,
            "      {:<6}{} {}",
            m.kind.as_str(),
            m.text,
            format!(":{}", m.line_number).dimmed()
        );
    }
    let _ = writeln!(out);
}
