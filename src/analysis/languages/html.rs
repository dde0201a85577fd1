//! Markup extractor with embedded script.
//!
//! Structurally significant elements become type declarations, external
//! `<script src>` and stylesheet links become imports, and inline `<script>`
//! bodies are handed to the script extractor on a view of the file where every
//! non-script character is blanked, so line numbers carry over unchanged.

use lazy_static::lazy_static;
use regex::Regex;

use super::javascript::extract_script;
use crate::analysis::facts::{FileFacts, ImportDecl, Port, TypeDecl};
use crate::detect::strip::{strip_lines, MARKUP_SYNTAX};

/// Elements reported as declarations.
const SIGNIFICANT_TAGS: &[&str] = &[
    "html", "head", "body", "header", "nav", "main", "section", "article", "aside", "footer",
    "form", "table", "dialog", "template",
];

const FIELD_TAGS: &[&str] = &["input", "select", "textarea", "button"];

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"<(/?)([A-Za-z][\w-]*)([^>]*)>").unwrap();
    static ref ATTR_RE: Regex = Regex::new(r#"([\w:@.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap();
    static ref LINK_REL_RE: Regex = Regex::new(r#"(?i)\brel\s*=\s*["']?(?:stylesheet|modulepreload|preload)"#).unwrap();
}

/// Byte ranges of inline script content on each line.
fn script_ranges(lines: &[&str]) -> Vec<Option<Vec<(usize, usize)>>> {
    let mut out = Vec::with_capacity(lines.len());
    let mut in_script = false;
    let mut external = false;

    for line in lines {
        let lower = line.to_ascii_lowercase();
        let mut ranges = Vec::new();
        let mut touched = in_script && !external;
        let mut cursor = 0;

        loop {
            if in_script {
                match lower[cursor..].find("</script") {
                    Some(close) => {
                        if !external {
                            ranges.push((cursor, cursor + close));
                        }
                        in_script = false;
                        cursor = lower[cursor + close..]
                            .find('>')
                            .map_or(line.len(), |p| cursor + close + p + 1);
                    }
                    None => {
                        if !external {
                            ranges.push((cursor, line.len()));
                        }
                        break;
                    }
                }
            } else {
                let Some(open) = lower[cursor..].find("<script") else {
                    break;
                };
                let start = cursor + open;
                let tag_end = lower[start..].find('>').map(|p| start + p);
                let tag = &lower[start..tag_end.unwrap_or(line.len())];
                external = tag.contains("src=") || tag.contains("src =");
                in_script = true;
                touched |= !external;
                match tag_end {
                    Some(end) => cursor = end + 1,
                    None => break,
                }
            }
        }

        out.push(if touched { Some(ranges) } else { None });
    }
    out
}

/// Per-line script view: `Some` for lines carrying inline script, with every
/// character outside the script replaced by a space.
pub fn script_view(lines: &[&str]) -> Vec<Option<String>> {
    script_ranges(lines)
        .into_iter()
        .zip(lines)
        .map(|(ranges, line)| ranges.map(|r| mask(line, &r, true)))
        .collect()
}

/// Keep (or blank, when `keep` is false) the characters inside `ranges`.
fn mask(line: &str, ranges: &[(usize, usize)], keep: bool) -> String {
    line.char_indices()
        .map(|(b, c)| {
            let inside = ranges.iter().any(|(s, e)| b >= *s && b < *e);
            if inside == keep {
                c
            } else {
                ' '
            }
        })
        .collect()
}

/// Extract facts from markup lines.
pub fn extract(lines: &[&str]) -> FileFacts {
    let ranges = script_ranges(lines);

    let script_lines: Vec<String> = ranges
        .iter()
        .zip(lines)
        .map(|(r, line)| r.as_ref().map_or_else(String::new, |r| mask(line, r, true)))
        .collect();
    let script_refs: Vec<&str> = script_lines.iter().map(String::as_str).collect();
    let mut facts = if ranges.iter().any(Option::is_some) {
        extract_script(&script_refs, false)
    } else {
        FileFacts::new()
    };

    let markup_lines: Vec<String> = ranges
        .iter()
        .zip(lines)
        .map(|(r, line)| match r {
            Some(r) => mask(line, r, false),
            None => line.to_string(),
        })
        .collect();
    let markup_refs: Vec<&str> = markup_lines.iter().map(String::as_str).collect();
    let markup = strip_lines(&markup_refs, MARKUP_SYNTAX).code;

    scan_markup(&markup, &mut facts);
    facts.finish()
}

fn scan_markup(markup: &[String], facts: &mut FileFacts) {
    let text = markup.join("\n");
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| line_starts.partition_point(|s| *s <= offset);

    let mut form: Option<usize> = None;
    let mut table: Option<usize> = None;

    for caps in TAG_RE.captures_iter(&text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let closing = !caps[1].is_empty();
        let tag = caps[2].to_ascii_lowercase();
        let attrs = parse_attrs(&caps[3]);
        let line = line_of(whole.start());

        if closing {
            match tag.as_str() {
                "form" => form = None,
                "table" => table = None,
                _ => {}
            }
            continue;
        }

        match tag.as_str() {
            "script" => {
                if let Some(src) = attr(&attrs, "src") {
                    push_asset(facts, src, line);
                }
            }
            "link" => {
                if let Some(href) = attr(&attrs, "href").filter(|_| LINK_REL_RE.is_match(&caps[3])) {
                    push_asset(facts, href, line);
                }
            }
            t if SIGNIFICANT_TAGS.contains(&t) => {
                let mut decl = TypeDecl::new(element_name(t, &attrs), line);
                if t == "form" {
                    for key in ["method", "action"] {
                        if let Some(v) = attr(&attrs, key) {
                            decl.decorators.push(format!("{key}={v}"));
                        }
                    }
                }
                facts.types.push(decl);
                let idx = facts.types.len() - 1;
                match t {
                    "form" => form = Some(idx),
                    "table" => table = Some(idx),
                    _ => {}
                }
            }
            t if FIELD_TAGS.contains(&t) => {
                let Some(idx) = form else { continue };
                let Some(name) = attr(&attrs, "name").or_else(|| attr(&attrs, "id")) else {
                    continue;
                };
                let kind = if t == "input" {
                    attr(&attrs, "type").unwrap_or("text")
                } else {
                    t
                };
                let mut port = Port::new(name).with_type(kind);
                if let Some(v) = attr(&attrs, "value") {
                    port = port.with_default(v);
                }
                facts.types[idx].add_attribute(port);
            }
            "th" => {
                let Some(idx) = table else { continue };
                let rest = &text[whole.end()..];
                let label = rest[..rest.find('<').unwrap_or(rest.len())].trim();
                if !label.is_empty() {
                    facts.types[idx].add_attribute(Port::new(label).with_type("column"));
                }
            }
            _ => {}
        }
    }
}

fn push_asset(facts: &mut FileFacts, module: &str, line: usize) {
    facts.imports.push(ImportDecl {
        module: module.to_string(),
        names: Vec::new(),
        is_from: false,
        line_number: line,
    });
    facts.note_import(line, line);
}

fn parse_attrs(text: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(text)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn attr<'v>(attrs: &'v [(String, String)], key: &str) -> Option<&'v str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// `tag#id`, `tag.first-class`, or the bare tag name.
fn element_name(tag: &str, attrs: &[(String, String)]) -> String {
    if let Some(id) = attr(attrs, "id") {
        return format!("{tag}#{id}");
    }
    match attr(attrs, "class").and_then(|c| c.split_whitespace().next()) {
        Some(class) => format!("{tag}.{class}"),
        None => tag.to_string(),
    }
}
