//! Detection of configuration literals baked into code.
//!
//! Rules are evaluated per code line in priority order:
//!
//! 1. credential-named assignment of a quoted literal, or credential-named
//!    `key: "literal"` pairs anywhere on the line (exclusive)
//! 2. URL
//! 3. IPv4 address, unless a URL matched
//! 4. absolute path literal, unless a URL matched
//! 5. `port = <integer>`
//! 6. plain assignment of a long quoted literal, only when nothing else matched

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

use super::strip::Stripped;
use super::types::{HardcodedKind, HardcodedValue};
use crate::analysis::scan::{find_assignment, find_top_level, is_constant_name};
use crate::config::HardcodedConfig;

lazy_static! {
    static ref CREDENTIAL_NAME_RE: Regex =
        Regex::new(r"(?i)(password|passwd|secret|key|token|api_key|credential|auth)").unwrap();
    static ref INLINE_CREDENTIAL_RE: Regex = Regex::new(
        r#"(?i)([\w$]*(?:password|passwd|secret|key|token|api_key|credential|auth)[\w$]*)["']?\s*(?:=>|:|=)\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`)"#
    )
    .unwrap();
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s"'`<>)\]]+"#).unwrap();
    static ref IP_RE: Regex = Regex::new(r"\b(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})\b").unwrap();
    static ref PATH_RE: Regex =
        Regex::new(r#"["'](/(?:[\w.@-]+/)+[\w.@-]*|~/[\w./@-]+|[A-Za-z]:\\[^"']+)["']"#).unwrap();
    static ref PORT_RE: Regex = Regex::new(r#"(?i)\bport["']?\s*(?:=>|[:=])\s*(\d+)\b"#).unwrap();
}

/// Declaration keywords dropped from an assignment target.
const TARGET_KEYWORDS: &[&str] = &[
    "const", "let", "var", "final", "static", "public", "private", "protected", "readonly",
    "export", "global",
];

/// Scan code lines for hardcoded values.
pub fn detect_hardcoded(
    lines: &[&str],
    stripped: &Stripped,
    import_lines: &BTreeSet<usize>,
    cfg: &HardcodedConfig,
) -> Vec<HardcodedValue> {
    let mut found = Vec::new();
    if !cfg.enabled {
        return found;
    }

    for (idx, line) in lines.iter().enumerate() {
        let line_number = idx + 1;
        if line.trim().is_empty()
            || !stripped.code_mask.get(idx).copied().unwrap_or(false)
            || import_lines.contains(&line_number)
        {
            continue;
        }
        let text = stripped.uncommented.get(idx).map_or(*line, String::as_str);
        scan_line(text.trim_end(), line_number, cfg, &mut found);
    }

    found
}

fn scan_line(text: &str, line_number: usize, cfg: &HardcodedConfig, found: &mut Vec<HardcodedValue>) {
    let assignment = split_assignment(text);
    let target = assignment.map(|(lhs, _)| target_name(lhs));
    let context = |fallback: &str| truncate(target.as_deref().unwrap_or(fallback), cfg.context_width);
    let push = |found: &mut Vec<HardcodedValue>, value: &str, kind: HardcodedKind, context: String| {
        found.push(HardcodedValue {
            value: value.to_string(),
            kind,
            line_number,
            context,
        });
    };

    if let (Some((_, rhs)), Some(target)) = (assignment, target.as_deref()) {
        if CREDENTIAL_NAME_RE.is_match(target) {
            if let Some(value) = quoted_literal(rhs) {
                push(found, value, HardcodedKind::Credential, context(target));
                return;
            }
        }
    }

    let before = found.len();
    for caps in INLINE_CREDENTIAL_RE.captures_iter(text) {
        if let Some(value) = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4)) {
            push(found, value.as_str(), HardcodedKind::Credential, context(&caps[1]));
        }
    }
    if found.len() > before {
        return;
    }

    let mut url_found = false;
    for m in URL_RE.find_iter(text) {
        url_found = true;
        let url = m.as_str().trim_end_matches(|c| matches!(c, ',' | ';' | '.'));
        push(found, url, HardcodedKind::Url, context(text.trim()));
    }
    if !url_found {
        for caps in IP_RE.captures_iter(text) {
            let valid = (1..=4).all(|i| caps[i].parse::<u16>().map_or(false, |o| o <= 255));
            if valid {
                push(found, &caps[0], HardcodedKind::Ip, context(text.trim()));
            }
        }
        for caps in PATH_RE.captures_iter(text) {
            push(found, &caps[1], HardcodedKind::Path, context(text.trim()));
        }
    }

    if let Some(caps) = PORT_RE.captures(text) {
        push(found, &caps[1], HardcodedKind::Number, "port".to_string());
    }

    if found.len() > before {
        return;
    }

    if let (Some((_, rhs)), Some(target)) = (assignment, target.as_deref()) {
        let last = target.rsplit(['.', '>']).next().unwrap_or(target);
        if is_constant_name(last) {
            return;
        }
        if let Some(value) = quoted_literal(rhs) {
            if value.chars().count() >= cfg.min_string_length {
                push(found, value, HardcodedKind::String, context(target));
            }
        }
    }
}

/// Split `lhs = rhs`, `'key' => rhs`, or `key: rhs` into its two sides.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    if let Some(i) = find_assignment(text) {
        let lhs = text[..i].trim_end_matches(|c| matches!(c, '+' | '-' | '*' | '/' | '.' | '?' | '|' | '&' | ':'));
        return Some((lhs, &text[i + 1..]));
    }
    if let Some(i) = text.find("=>") {
        let lhs = text[..i].trim();
        if quoted_literal(lhs).is_some() {
            return Some((lhs, &text[i + 2..]));
        }
    }
    let i = find_top_level(text, ':')?;
    let lhs = text[..i].trim();
    let plain_key = !lhs.is_empty()
        && (quoted_literal(lhs).is_some()
            || lhs.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
    plain_key.then(|| (lhs, &text[i + 1..]))
}

/// Assignment target with declaration keywords, type annotations, and quotes removed.
fn target_name(lhs: &str) -> String {
    let lhs = lhs.trim();
    let lhs = match find_top_level(lhs, ':') {
        Some(i) => &lhs[..i],
        None => lhs,
    };
    let words: Vec<&str> = lhs
        .split_whitespace()
        .skip_while(|w| TARGET_KEYWORDS.contains(w))
        .collect();
    let name = words.last().copied().unwrap_or("");
    name.trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .trim_start_matches('$')
        .to_string()
}

/// Content of a single quoted literal, ignoring a trailing `;` or `,`.
fn quoted_literal(value: &str) -> Option<&str> {
    let v = value.trim().trim_end_matches([';', ',']).trim_end();
    let v = v.trim_start_matches(|c: char| matches!(c, 'r' | 'b' | 'f' | 'u' | 'R' | 'B' | 'F' | 'U'));
    let first = v.chars().next()?;
    if !matches!(first, '"' | '\'' | '`') || v.len() < 2 || !v.ends_with(first) {
        return None;
    }
    let inner = &v[1..v.len() - 1];
    // `"a" + "b"` is an expression, not one literal.
    if inner.contains(first) {
        return None;
    }
    Some(inner)
}

fn truncate(s: &str, width: usize) -> String {
    s.trim().chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Language;
    use crate::detect::strip::strip_source;

    fn run(src: &str, language: Language) -> Vec<HardcodedValue> {
        let lines: Vec<&str> = src.lines().collect();
        let stripped = strip_source(&lines, language);
        detect_hardcoded(&lines, &stripped, &BTreeSet::new(), &HardcodedConfig::default())
    }

    fn kinds(found: &[HardcodedValue]) -> Vec<(HardcodedKind, usize)> {
        found.iter().map(|h| (h.kind, h.line_number)).collect()
    }

    #[test]
    fn test_credential_wins() {
        let src = "import os\n\n\n\npassword = \"s3cr3t123\"\n";
        let found = run(src, Language::Python);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Credential, 5)]);
        assert_eq!(found[0].value, "s3cr3t123");
        assert_eq!(found[0].context, "password");
    }

    #[test]
    fn test_credential_suppresses_url() {
        let found = run("const apiToken = \"https://user:pw@example.com\";", Language::JavaScript);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Credential, 1)]);
    }

    #[test]
    fn test_url_ip_and_path() {
        let src = "\
base = \"https://api.example.com/v1\"
host = \"10.0.0.12\"
log_file = \"/var/log/app/out.log\"
";
        let found = run(src, Language::Python);
        assert_eq!(
            kinds(&found),
            vec![
                (HardcodedKind::Url, 1),
                (HardcodedKind::Ip, 2),
                (HardcodedKind::Path, 3)
            ]
        );
        assert_eq!(found[0].value, "https://api.example.com/v1");
        assert_eq!(found[1].context, "host");
    }

    #[test]
    fn test_url_hides_ip_on_same_line() {
        let found = run("server = \"http://192.168.1.1:8080/\"", Language::Python);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Url, 1)]);
    }

    #[test]
    fn test_port_number_coexists_with_url() {
        let found = run("connect(\"http://localhost\", port = 5432)", Language::Python);
        assert_eq!(
            kinds(&found),
            vec![(HardcodedKind::Url, 1), (HardcodedKind::Number, 1)]
        );
        assert_eq!(found[1].value, "5432");
        assert_eq!(found[1].context, "port");
    }

    #[test]
    fn test_plain_string_rules() {
        let src = "\
greeting = \"hello there friend\"
short = \"abc\"
DEFAULT_GREETING = \"hello there friend\"
label: 'a much longer label',
";
        let found = run(src, Language::JavaScript);
        assert_eq!(
            kinds(&found),
            vec![(HardcodedKind::String, 1), (HardcodedKind::String, 4)]
        );
        assert_eq!(found[1].context, "label");
    }

    #[test]
    fn test_comments_and_imports_are_skipped() {
        let src = "# password = \"s3cr3t123\"\nfrom x import y  # https://example.com\n";
        let lines: Vec<&str> = src.lines().collect();
        let stripped = strip_source(&lines, Language::Python);
        let imports: BTreeSet<usize> = [2].into_iter().collect();
        let found = detect_hardcoded(&lines, &stripped, &imports, &HardcodedConfig::default());
        assert!(found.is_empty());

        let found = run("x = 1  # see https://example.com", Language::Python);
        assert!(found.is_empty());
    }

    #[test]
    fn test_php_array_and_property() {
        let src = "<?php\n$config = ['password' => 'hunter22'];\nprivate $secret = 'abc123';\n";
        let found = run(src, Language::Php);
        assert_eq!(
            kinds(&found),
            vec![(HardcodedKind::Credential, 2), (HardcodedKind::Credential, 3)]
        );
        assert_eq!(found[0].value, "hunter22");
        assert_eq!(found[0].context, "password");
    }

    #[test]
    fn test_inline_credential_pairs() {
        let found = run("client = connect(host, password=\"hunter22\")", Language::Python);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Credential, 1)]);
        assert_eq!(found[0].value, "hunter22");
        assert_eq!(found[0].context, "password");

        let found = run("const cfg = { apiKey: \"sk_live_1234\", url: \"https://api.example.com\" };", Language::JavaScript);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Credential, 1)]);
        assert_eq!(found[0].value, "sk_live_1234");
        assert_eq!(found[0].context, "apiKey");

        let found = run("if (token === \"\") { retry(); }", Language::JavaScript);
        assert!(found.is_empty());
    }

    #[test]
    fn test_leading_block_comment_keeps_code() {
        let found = run("/* port */ const url = \"http://x.example\";", Language::JavaScript);
        assert_eq!(kinds(&found), vec![(HardcodedKind::Url, 1)]);
        assert_eq!(found[0].value, "http://x.example");
    }
}
