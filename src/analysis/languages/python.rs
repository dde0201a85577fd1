//! Indentation-delimited extractor (Python).
//!
//! Imports, `raise`/`except`/`try` lines are harvested in one flat pass over
//! the stripped copy. Declarations are found by a scope walk: at a given
//! indentation baseline, `def` and `class` headers are recognised and their
//! bodies are every following line indented deeper than the header. Class
//! bodies are walked again at their own baseline to find methods.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::analysis::facts::{Callable, FileFacts, ImportDecl, Port, TypeDecl};
use crate::analysis::scan::{
    count_complexity, delimited_text, find_assignment, indent_width, indented_block_end,
    infer_literal_type, is_constant_name, paren_header_end, split_colon_param, split_top_level,
    BranchStyle,
};
use crate::detect::strip::{strip_lines, PYTHON_SYNTAX};

/// Exception names too generic to describe a failure mode.
const GENERIC_ERRORS: &[&str] = &["Exception", "BaseException"];

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "continue", "del", "else", "except", "finally", "global",
    "if", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "return", "while", "with",
    "yield",
];

lazy_static! {
    static ref DEF_RE: Regex = Regex::new(r"^(\s*)(async\s+)?def\s+([A-Za-z_]\w*)\s*\(").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)\s*(\()?").unwrap();
    static ref DECORATOR_RE: Regex = Regex::new(r"^\s*@\s*[A-Za-z_]").unwrap();
    static ref IMPORT_RE: Regex = Regex::new(r"^\s*import\s+(.+)$").unwrap();
    static ref FROM_RE: Regex = Regex::new(r"^\s*from\s+(\S+)\s+import\s+(.*)$").unwrap();
    static ref IMPORT_NAME_RE: Regex = Regex::new(r"^([\w.*]+)(?:\s+as\s+(\w+))?$").unwrap();
    static ref ASSIGN_RE: Regex = Regex::new(r"^([A-Za-z_]\w*)\s*(?::\s*([^=]+?))?\s*=[^=]").unwrap();
    static ref ANNOTATED_RE: Regex = Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(\S.*)$").unwrap();
    static ref SELF_ATTR_RE: Regex = Regex::new(r"\bself\.([A-Za-z_]\w*)\s*(?::\s*([^=]+?))?\s*=[^=]").unwrap();
    static ref RAISE_RE: Regex = Regex::new(r"\braise\s+([A-Za-z_][\w.]*)").unwrap();
    static ref EXCEPT_RE: Regex = Regex::new(r"^\s*except\b\s*\*?\s*(.*?)\s*:").unwrap();
    static ref TRY_RE: Regex = Regex::new(r"^\s*try\s*:").unwrap();
    static ref RETURN_RE: Regex = Regex::new(r"\)\s*->\s*(.+?)\s*:\s*(?:#.*)?$").unwrap();
    static ref HEADER_TAIL_RE: Regex = Regex::new(r"\)\s*(?:->[^:]*)?:(.*)$").unwrap();
}

/// Extract facts from Python source lines.
pub fn extract(lines: &[&str]) -> FileFacts {
    let stripped = strip_lines(lines, PYTHON_SYNTAX);
    let mut scan = PyScan {
        lines,
        code: &stripped.code,
        comments: &stripped.comments,
        facts: FileFacts::new(),
    };
    scan.harvest_statements();
    scan.scan_scope(0, lines.len(), 0, None);
    scan.facts.finish()
}

struct PyScan<'a> {
    lines: &'a [&'a str],
    code: &'a [String],
    comments: &'a [String],
    facts: FileFacts,
}

impl<'a> PyScan<'a> {
    /// Imports, raise and exception-handling lines, at any depth.
    fn harvest_statements(&mut self) {
        let view: Vec<&str> = self.code.iter().map(String::as_str).collect();
        let mut i = 0;
        while i < view.len() {
            let line = view[i];

            if let Some(caps) = FROM_RE.captures(line) {
                let module = caps[1].to_string();
                let rest = caps.get(2).map_or(line.len(), |m| m.start());
                let (text, end) = import_names_text(&view, i, rest);
                let names = bound_names(&text);
                self.facts.imports.push(ImportDecl {
                    module,
                    names,
                    is_from: true,
                    line_number: i + 1,
                });
                self.facts.note_import(i + 1, end + 1);
                i = end + 1;
                continue;
            }

            if let Some(caps) = IMPORT_RE.captures(line) {
                let rest = caps.get(1).map_or(line.len(), |m| m.start());
                let (text, end) = import_names_text(&view, i, rest);
                for part in split_top_level(&text, ',') {
                    if let Some(c) = IMPORT_NAME_RE.captures(&part) {
                        let module = c[1].to_string();
                        let bound = c.get(2).map_or(module.clone(), |a| a.as_str().to_string());
                        self.facts.imports.push(ImportDecl {
                            module,
                            names: vec![bound],
                            is_from: false,
                            line_number: i + 1,
                        });
                    }
                }
                self.facts.note_import(i + 1, end + 1);
                i = end + 1;
                continue;
            }

            if TRY_RE.is_match(line) {
                self.facts.add_risk_point(i + 1);
            }

            if let Some(caps) = EXCEPT_RE.captures(line) {
                self.facts.add_risk_point(i + 1);
                let clause = caps[1].split(" as ").next().unwrap_or("");
                let clause = clause.trim().trim_start_matches('(').trim_end_matches(')');
                for name in clause.split(',') {
                    let name = name.trim();
                    if !name.is_empty() && !GENERIC_ERRORS.contains(&name) {
                        self.facts.add_error_name(name);
                    }
                }
            }

            for caps in RAISE_RE.captures_iter(line) {
                let name = &caps[1];
                let last = name.rsplit('.').next().unwrap_or(name);
                if last.starts_with(|c: char| c.is_ascii_uppercase()) && !GENERIC_ERRORS.contains(&last) {
                    self.facts.add_error_name(name);
                }
            }

            i += 1;
        }
    }

    /// Walk declarations at exactly `indent` within `[from, to)`.
    fn scan_scope(&mut self, from: usize, to: usize, indent: usize, mut owner: Option<&mut TypeDecl>) {
        let code_lines: &'a [String] = self.code;
        let mut decorators: Vec<String> = Vec::new();
        let mut i = from;

        while i < to {
            let code = code_lines[i].as_str();
            if code.trim().is_empty() {
                i += 1;
                continue;
            }
            if indent_width(code) != indent {
                decorators.clear();
                i += 1;
                continue;
            }

            if DECORATOR_RE.is_match(code) {
                decorators.push(self.decorator_text(i));
                i = paren_header_end(self.code, i) + 1;
                continue;
            }

            if let Some(caps) = DEF_RE.captures(code) {
                let (mut callable, header_end, end) = self.parse_def(i, &caps);
                callable.decorators = std::mem::take(&mut decorators);
                self.facts.note_header(i + 1, header_end + 1);
                match owner.as_deref_mut() {
                    Some(decl) => {
                        if callable.name == "__init__" {
                            self.harvest_self_attributes(header_end + 1, end, decl);
                        }
                        decl.methods.push(callable);
                    }
                    None => self.facts.callables.push(callable),
                }
                i = end.max(i + 1);
                continue;
            }

            if let Some(caps) = CLASS_RE.captures(code) {
                let decl_decorators = std::mem::take(&mut decorators);
                i = self.parse_class(i, &caps, decl_decorators).max(i + 1);
                continue;
            }

            decorators.clear();
            let trimmed = code.trim();
            match owner.as_deref_mut() {
                Some(decl) => {
                    if let Some(port) = self.attribute_at(i, trimmed) {
                        decl.add_attribute(port);
                    }
                }
                None if indent == 0 => self.global_at(i, trimmed),
                None => {}
            }
            i += 1;
        }
    }

    /// Parse a `def` header. Returns the callable, the header's last line,
    /// and the exclusive end of its body.
    fn parse_def(&self, i: usize, caps: &Captures) -> (Callable, usize, usize) {
        let indent = caps[1].chars().count();
        let name = caps[3].to_string();
        let open = caps.get(0).map_or(0, |m| m.end() - 1);
        let col = self.code[i][..open].chars().count();

        let (params, header_end) = match delimited_text(self.lines, i, col, '(', ')') {
            Some((text, end)) => (parse_params(&text), end),
            None => (Vec::new(), paren_header_end(self.code, i)),
        };
        let end = indented_block_end(self.code, header_end, indent);

        let mut callable = Callable::new(name.clone(), i + 1);
        callable.params = params;
        callable.is_async = caps.get(2).is_some();
        callable.is_private = name.starts_with('_') && !is_dunder(&name);
        if let Some(ret) = RETURN_RE.captures(self.lines[header_end]) {
            callable.return_type = ret[1].trim().to_string();
        }

        let mut body: Vec<&str> = Vec::new();
        if let Some(tail) = HEADER_TAIL_RE.captures(&self.code[header_end]) {
            if let Some(t) = tail.get(1).filter(|t| !t.as_str().trim().is_empty()) {
                body.push(t.as_str());
            }
        }
        body.extend(self.code[header_end + 1..end].iter().map(String::as_str));
        callable.complexity = count_complexity(&body, BranchStyle::Indent);

        (callable, header_end, end)
    }

    /// Parse a `class` header and its body. Returns the exclusive end of the body.
    fn parse_class(&mut self, i: usize, caps: &Captures, decorators: Vec<String>) -> usize {
        let indent = caps[1].chars().count();
        let mut decl = TypeDecl::new(&caps[2], i + 1);
        decl.decorators = decorators;

        let mut header_end = i;
        if let Some(open) = caps.get(3) {
            let col = self.code[i][..open.start()].chars().count();
            if let Some((text, end)) = delimited_text(self.lines, i, col, '(', ')') {
                decl.bases = split_top_level(&text, ',')
                    .into_iter()
                    .filter(|b| !b.contains('='))
                    .collect();
                header_end = end;
            }
        }
        let end = indented_block_end(self.code, header_end, indent);

        let body_indent = self.code[header_end + 1..end]
            .iter()
            .find(|l| !l.trim().is_empty())
            .map(|l| indent_width(l));
        if let Some(body_indent) = body_indent {
            self.scan_scope(header_end + 1, end, body_indent, Some(&mut decl));
        }

        self.facts.types.push(decl);
        end
    }

    /// `self.x = ...` assignments inside a constructor body.
    fn harvest_self_attributes(&self, from: usize, to: usize, decl: &mut TypeDecl) {
        for idx in from..to {
            for caps in SELF_ATTR_RE.captures_iter(&self.code[idx]) {
                let name = &caps[1];
                let mut port = Port::new(name);
                if let Some(t) = caps.get(2) {
                    port = port.with_type(t.as_str());
                }
                let original = self.lines[idx];
                if let Some(pos) = original.find(&format!("self.{name}")) {
                    if let Some(eq) = find_assignment(&original[pos..]) {
                        let value = cut_comment(&original[pos + eq + 1..], &self.comments[idx]);
                        port = port.with_default(value);
                    }
                }
                decl.add_attribute(port);
            }
        }
    }

    /// Class-level `name = value` or `name: type` line.
    fn attribute_at(&self, i: usize, trimmed: &str) -> Option<Port> {
        if let Some(caps) = ASSIGN_RE.captures(trimmed) {
            let name = &caps[1];
            if KEYWORDS.contains(&name) {
                return None;
            }
            let value = self.value_at(i).unwrap_or_default();
            let port = match caps.get(2) {
                Some(t) => Port::new(name).with_type(t.as_str()),
                None => Port::new(name).with_type(infer_literal_type(&value)),
            };
            return Some(port.with_default(value));
        }
        let caps = ANNOTATED_RE.captures(trimmed)?;
        let name = &caps[1];
        if KEYWORDS.contains(&name) {
            return None;
        }
        Some(Port::new(name).with_type(&caps[2]))
    }

    /// Zero-indentation assignment to an upper-snake-case name.
    fn global_at(&mut self, i: usize, trimmed: &str) {
        let Some(caps) = ASSIGN_RE.captures(trimmed) else {
            return;
        };
        let name = &caps[1];
        if !is_constant_name(name) {
            return;
        }
        let value = self.value_at(i).unwrap_or_default();
        let type_name = caps
            .get(2)
            .map(|t| t.as_str().trim().to_string())
            .unwrap_or_else(|| infer_literal_type(&value));
        self.facts
            .globals
            .push(Port::new(name).with_type(type_name).with_default(value));
        self.facts.global_lines.push(i + 1);
    }

    fn value_at(&self, i: usize) -> Option<String> {
        let original = self.lines[i];
        let eq = find_assignment(original)?;
        Some(cut_comment(&original[eq + 1..], &self.comments[i]))
    }

    fn decorator_text(&self, i: usize) -> String {
        cut_comment(self.lines[i], &self.comments[i])
            .trim_start_matches('@')
            .trim()
            .to_string()
    }
}

/// Text of the imported-names part, following parentheses or backslash continuations.
fn import_names_text(view: &[&str], i: usize, start: usize) -> (String, usize) {
    let line = view[i];
    let rest = line[start..].trim();
    if rest.starts_with('(') {
        let col = line[..start].chars().count() + line[start..].chars().take_while(|c| *c != '(').count();
        if let Some((text, end)) = delimited_text(view, i, col, '(', ')') {
            return (text, end);
        }
        return (rest.trim_start_matches('(').to_string(), i);
    }

    let mut text = rest.to_string();
    let mut end = i;
    while text.ends_with('\\') && end + 1 < view.len() {
        text.pop();
        end += 1;
        text.push(' ');
        text.push_str(view[end].trim());
    }
    (text, end)
}

/// Names bound by `from x import a, b as c`.
fn bound_names(text: &str) -> Vec<String> {
    split_top_level(text, ',')
        .iter()
        .filter_map(|part| IMPORT_NAME_RE.captures(part))
        .map(|c| c.get(2).map_or_else(|| c[1].to_string(), |a| a.as_str().to_string()))
        .collect()
}

fn parse_params(text: &str) -> Vec<Port> {
    split_top_level(text, ',')
        .into_iter()
        .filter_map(|raw| {
            let param = split_colon_param(&raw);
            let name = param.name;
            if name.is_empty() || matches!(name.as_str(), "*" | "/" | "self" | "cls") {
                return None;
            }
            let mut port = Port::new(name);
            if let Some(t) = param.type_name {
                port = port.with_type(t);
            }
            if let Some(d) = param.default {
                port = port.with_default(d);
            }
            Some(port)
        })
        .collect()
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// Drop a trailing `# comment` when the stripper found one on this line.
fn cut_comment(text: &str, comment: &str) -> String {
    let text = if comment.is_empty() {
        text
    } else {
        text.rfind('#').map_or(text, |p| &text[..p])
    };
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> FileFacts {
        let lines: Vec<&str> = src.lines().collect();
        extract(&lines)
    }

    #[test]
    fn test_imports() {
        let facts = run("import os, sys as system\nfrom typing import (\n    List,\n    Dict as D,\n)\nfrom . import sibling\n");
        assert_eq!(facts.imports.len(), 4);
        assert_eq!(facts.imports[0].module, "os");
        assert!(!facts.imports[0].is_from);
        assert_eq!(facts.imports[1].names, vec!["system"]);
        assert_eq!(facts.imports[2].module, "typing");
        assert_eq!(facts.imports[2].names, vec!["List", "D"]);
        assert!(facts.imports[2].is_from);
        assert_eq!(facts.imports[3].module, ".");
        assert!(facts.import_lines.contains(&4));
        assert!(facts.import_lines.contains(&5));
    }

    #[test]
    fn test_function_params_and_return() {
        let facts = run("async def fetch(url: str, retries: int = 3, *args, **kwargs) -> dict:\n    return {}\n");
        let f = &facts.callables[0];
        assert_eq!(f.name, "fetch");
        assert!(f.is_async);
        assert_eq!(f.return_type, "dict");
        let names: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["url", "retries", "*args", "**kwargs"]);
        assert_eq!(f.params[1].type_name, "int");
        assert_eq!(f.params[1].default.as_deref(), Some("3"));
        assert_eq!(f.params[2].type_name, "any");
    }

    #[test]
    fn test_default_with_commas_is_not_split() {
        let facts = run("def f(a, b=(1, 2), c={'x': 1, 'y': 2}):\n    pass\n");
        let f = &facts.callables[0];
        assert_eq!(f.params.len(), 3);
        assert_eq!(f.params[1].default.as_deref(), Some("(1, 2)"));
    }

    #[test]
    fn test_class_with_methods_and_attributes() {
        let src = "\
@dataclass
class Service(Base, metaclass=Meta):
    retries: int = 3
    name = 'svc'

    def __init__(self, client):
        self.client = client
        self._cache: dict = {}

    def _helper(self):
        if self.client:
            return 1
        return 0

def top():
    pass
";
        let facts = run(src);
        assert_eq!(facts.types.len(), 1);
        let t = &facts.types[0];
        assert_eq!(t.name, "Service");
        assert_eq!(t.line_number, 2);
        assert_eq!(t.bases, vec!["Base"]);
        assert_eq!(t.decorators, vec!["dataclass"]);
        let attrs: Vec<&str> = t.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["retries", "name", "client", "_cache"]);
        assert_eq!(t.attributes[1].type_name, "string");
        assert_eq!(t.methods.len(), 2);
        assert!(t.methods[0].params.iter().all(|p| p.name != "self"));
        assert!(t.methods[1].is_private);
        assert_eq!(t.methods[1].complexity, 1);
        assert!(!t.methods[0].is_private);
        assert_eq!(facts.callables.len(), 1);
        assert_eq!(facts.callables[0].name, "top");
        assert_eq!(facts.callables[0].line_number, 15);
    }

    #[test]
    fn test_globals() {
        let facts = run("MAX_SIZE = 100\nRATE = 0.5\nNAMES = ['a', 'b']\nlower = 1\nDEBUG: bool = False\n");
        let globals: Vec<(&str, &str)> = facts
            .globals
            .iter()
            .map(|g| (g.name.as_str(), g.type_name.as_str()))
            .collect();
        assert_eq!(
            globals,
            vec![("MAX_SIZE", "integer"), ("RATE", "float"), ("NAMES", "list"), ("DEBUG", "bool")]
        );
        assert_eq!(facts.global_lines, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_errors_and_risk_points() {
        let src = "\
def load(path):
    try:
        return open(path).read()
    except (IOError, ValueError) as e:
        raise ConfigError('bad') from e
    except Exception:
        raise
";
        let facts = run(src);
        assert_eq!(facts.error_names, vec!["IOError", "ValueError", "ConfigError"]);
        assert_eq!(facts.risk_points, vec![2, 4, 6]);
    }

    #[test]
    fn test_complexity_counts_body_branches() {
        let src = "\
def route(x):
    if x > 1:
        return 'a'
    elif x < 0:
        return 'b'
    else:
        for i in range(x):
            while i:
                i -= 1
    return 'c' if x else 'd'
";
        let facts = run(src);
        assert_eq!(facts.callables[0].complexity, 6);
    }

    #[test]
    fn test_one_line_def() {
        let facts = run("def helper(x): return x + 1\n");
        assert_eq!(facts.callables.len(), 1);
        assert_eq!(facts.callables[0].params[0].name, "x");
        assert!(facts.header_lines.contains(&1));
    }

    #[test]
    fn test_def_inside_string_is_ignored() {
        let facts = run("DOC = \"\"\"\ndef fake():\n    pass\n\"\"\"\n");
        assert!(facts.callables.is_empty());
    }
}
