//! Line-level scanning primitives shared by the extractors.
//!
//! Scope boundaries are reconstructed with explicit counters instead of a
//! parser: brace depth for the brace families, leading whitespace for the
//! indentation family. All functions here take 0-based line indices.

use lazy_static::lazy_static;
use regex::Regex;

use super::facts::UNKNOWN_TYPE;

/// How far past a header line to look for the opening brace of its body.
const BRACE_LOOKAHEAD: usize = 12;

/// How far a parenthesised header may span.
const PAREN_LOOKAHEAD: usize = 64;

lazy_static! {
    static ref INT_RE: Regex = Regex::new(r"^[-+]?(?:0[xXoObB][0-9a-fA-F_]+|\d[\d_]*)[nLl]?$").unwrap();
    static ref FLOAT_RE: Regex = Regex::new(r"^[-+]?(?:\d[\d_]*\.\d*|\.\d+)(?:[eE][-+]?\d+)?$|^[-+]?\d+[eE][-+]?\d+$").unwrap();
    static ref CONSTANT_RE: Regex = Regex::new(r"^_*[A-Z][A-Z0-9_]*$").unwrap();
    static ref PY_INLINE_IF_RE: Regex = Regex::new(r"\S\s+if\s+.+\s+else\b").unwrap();
    static ref TERNARY_RE: Regex = Regex::new(r"\s\?\s").unwrap();
}

/// Count of leading whitespace characters.
pub fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Index of the line where the parentheses opened on `start` are balanced again.
///
/// Returns `start` when the header has no unbalanced parentheses.
pub fn paren_header_end(stripped: &[String], start: usize) -> usize {
    let mut depth: i32 = 0;
    let last = (start + PAREN_LOOKAHEAD).min(stripped.len().saturating_sub(1));
    for (idx, line) in stripped.iter().enumerate().take(last + 1).skip(start) {
        for c in line.chars() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                _ => {}
            }
        }
        if depth <= 0 {
            return idx;
        }
    }
    start
}

/// Exclusive end of an indentation-delimited body.
///
/// The body is every line after `header_end` whose indentation exceeds
/// `header_indent`, stopping at the first non-blank line at or below it.
/// Trailing blank lines are not part of the body.
pub fn indented_block_end(stripped: &[String], header_end: usize, header_indent: usize) -> usize {
    let mut end = header_end + 1;
    for (idx, line) in stripped.iter().enumerate().skip(header_end + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_width(line) <= header_indent {
            break;
        }
        end = idx + 1;
    }
    end
}

/// Inclusive index of the line holding the closing brace of the body that
/// starts at or after `start`.
///
/// Depth is counted on stripped text so braces inside literals are ignored.
/// Braces inside the header's parentheses (default values) do not open the
/// body. A `;` before any body brace means the declaration has no body and
/// `start`'s statement line is returned. An unterminated body runs to the end.
pub fn brace_block_end(stripped: &[String], start: usize) -> usize {
    header_block_end(stripped, start, start)
}

/// [`brace_block_end`] for a header whose parentheses close on `header_end`.
///
/// Scanning still begins at `start` so parameter braces are tracked, but the
/// body lookahead is counted from `header_end`.
pub fn header_block_end(stripped: &[String], start: usize, header_end: usize) -> usize {
    let mut depth: i32 = 0;
    let mut parens: i32 = 0;
    let mut started = false;

    for (idx, line) in stripped.iter().enumerate().skip(start) {
        if !started && idx > header_end.max(start) + BRACE_LOOKAHEAD {
            return start;
        }
        for c in line.chars() {
            match c {
                '(' => parens += 1,
                ')' => parens -= 1,
                '{' if started || parens <= 0 => {
                    depth += 1;
                    started = true;
                }
                '}' if started => {
                    depth -= 1;
                    if depth == 0 {
                        return idx;
                    }
                }
                ';' if !started && parens <= 0 => return idx,
                _ => {}
            }
        }
    }
    stripped.len().saturating_sub(1).max(start)
}

/// Brace depth at the start of each line of `stripped[from..to]`, relative to `from`.
pub fn depth_profile(stripped: &[String], from: usize, to: usize) -> Vec<i32> {
    let mut depths = Vec::with_capacity(to.saturating_sub(from));
    let mut depth = 0;
    for line in stripped.iter().take(to).skip(from) {
        depths.push(depth);
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
    }
    depths
}

/// Text between the delimiter at `(line, col)` and its match, joined across lines.
///
/// `col` is a char index of the opening delimiter in `lines[line]`. Quotes are
/// honoured so delimiters inside default-value literals do not count. Returns
/// the inner text and the line index holding the closing delimiter.
pub fn delimited_text(
    lines: &[&str],
    line: usize,
    col: usize,
    open: char,
    close: char,
) -> Option<(String, usize)> {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut text = String::new();
    let last = (line + PAREN_LOOKAHEAD).min(lines.len().saturating_sub(1));

    for idx in line..=last {
        let chars: Vec<char> = lines[idx].chars().collect();
        let begin = if idx == line { col } else { 0 };
        let mut i = begin;
        while i < chars.len() {
            let c = chars[i];
            if let Some(q) = quote {
                text.push(c);
                if c == '\\' {
                    if let Some(next) = chars.get(i + 1) {
                        text.push(*next);
                    }
                    i += 2;
                    continue;
                }
                if c == q {
                    quote = None;
                }
                i += 1;
                continue;
            }
            if c == open {
                depth += 1;
                if depth == 1 {
                    i += 1;
                    continue;
                }
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Some((text, idx));
                }
            } else if c == '"' || c == '\'' || c == '`' {
                quote = Some(c);
            } else if c == '#' && depth > 0 && open == '(' && chars.get(i + 1) != Some(&'[') {
                // Python/PHP trailing comment inside a multi-line parameter list.
                if text.trim_end().ends_with(',') || text.trim().is_empty() {
                    break;
                }
            }
            if depth > 0 {
                text.push(c);
            }
            i += 1;
        }
        if depth > 0 {
            text.push(' ');
        }
    }
    None
}

/// Split on `sep` where no bracket, angle-bracket, or quote is open.
pub fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut prev = ' ';

    for c in s.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q && prev != '\\' {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            depth = 0;
        }
        if c == sep && depth == 0 {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        prev = c;
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Byte index of the first top-level `ch`.
pub fn find_top_level(s: &str, ch: char) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q && prev != '\\' {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '>' if prev != '=' => depth -= 1,
            _ if c == ch && depth <= 0 => return Some(i),
            _ => {}
        }
        prev = c;
    }
    None
}

/// Byte index of the first top-level assignment `=` (not `==`, `=>`, `<=`, `>=`, `!=`).
pub fn find_assignment(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut offset = 0;
    while let Some(rel) = find_top_level(&s[offset..], '=') {
        let i = offset + rel;
        let prev = if i > 0 { bytes[i - 1] } else { b' ' };
        let next = bytes.get(i + 1).copied().unwrap_or(b' ');
        if next != b'=' && next != b'>' && !matches!(prev, b'=' | b'!' | b'<' | b'>') {
            return Some(i);
        }
        offset = i + 1;
        while offset < s.len() && bytes[offset] == b'=' {
            offset += 1;
        }
        if offset >= s.len() {
            break;
        }
    }
    None
}

/// A parameter split into name, declared type, and default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParam {
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<String>,
}

/// Split `name: type = default` style parameters (Python, TypeScript).
pub fn split_colon_param(raw: &str) -> RawParam {
    let (head, default) = match find_assignment(raw) {
        Some(i) => (&raw[..i], Some(raw[i + 1..].trim().to_string())),
        None => (raw, None),
    };
    let (name, type_name) = match find_top_level(head, ':') {
        Some(i) => (&head[..i], Some(head[i + 1..].trim().to_string())),
        None => (head, None),
    };
    RawParam {
        name: name.trim().to_string(),
        type_name: type_name.filter(|t| !t.is_empty()),
        default: default.filter(|d| !d.is_empty()),
    }
}

/// Which keyword set the complexity counter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchStyle {
    Indent,
    Brace,
}

const INDENT_BRANCHES: &[&str] = &["if", "elif", "else", "for", "while", "except", "case"];
const BRACE_BRANCHES: &[&str] = &[
    "if", "else", "elseif", "for", "foreach", "while", "case", "switch", "catch",
];

/// Count branch-introducing constructs in a body span.
///
/// A line counts once when it begins with a branch keyword; inline
/// conditional expressions on any line add one each.
pub fn count_complexity<S: AsRef<str>>(body: &[S], style: BranchStyle) -> usize {
    let keywords = match style {
        BranchStyle::Indent => INDENT_BRANCHES,
        BranchStyle::Brace => BRACE_BRANCHES,
    };
    let mut count = 0;
    for line in body {
        let trimmed = line.as_ref().trim();
        let lead = trimmed.trim_start_matches(|c: char| c == '}' || c.is_whitespace());
        let lead = lead.strip_prefix("async ").unwrap_or(lead);
        let first_word: String = lead
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let starts_branch = keywords.contains(&first_word.as_str());
        if starts_branch {
            count += 1;
        }
        count += match style {
            BranchStyle::Indent if !starts_branch || first_word == "return" => {
                PY_INLINE_IF_RE.find_iter(lead).count()
            }
            BranchStyle::Indent => 0,
            BranchStyle::Brace => TERNARY_RE.find_iter(trimmed).count(),
        };
    }
    count
}

/// Coarse type of a literal value.
pub fn infer_literal_type(value: &str) -> String {
    let v = value.trim().trim_end_matches(';').trim();
    let t = if v.is_empty() {
        UNKNOWN_TYPE
    } else if matches!(v, "true" | "false" | "True" | "False" | "TRUE" | "FALSE") {
        "boolean"
    } else if INT_RE.is_match(v) {
        "integer"
    } else if FLOAT_RE.is_match(v) {
        "float"
    } else if is_quoted(v) {
        "string"
    } else if v.starts_with('[') || v.starts_with("array(") {
        "list"
    } else if v.starts_with('{') || v.starts_with("dict(") || v.starts_with("new Map(") {
        "map"
    } else if v.starts_with('(') && find_top_level(&v[1..], ',').is_some() {
        "tuple"
    } else {
        UNKNOWN_TYPE
    };
    t.to_string()
}

/// Whether a value is a single quoted literal (with an optional Python string prefix).
pub fn is_quoted(value: &str) -> bool {
    let v = value.trim_start_matches(|c: char| matches!(c, 'r' | 'b' | 'f' | 'u' | 'R' | 'B' | 'F' | 'U'));
    let mut chars = v.chars();
    match (chars.next(), v.chars().last()) {
        (Some(a), Some(b)) if v.len() >= 2 && a == b => matches!(a, '"' | '\'' | '`'),
        _ => false,
    }
}

/// Whether a name follows the upper-snake-case constant convention.
pub fn is_constant_name(name: &str) -> bool {
    CONSTANT_RE.is_match(name)
}

/// Char index of the first occurrence of `needle` in `line`.
pub fn char_index_of(line: &str, needle: char) -> Option<usize> {
    line.chars().position(|c| c == needle)
}

/// Collapse whitespace runs into single spaces.
pub fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
