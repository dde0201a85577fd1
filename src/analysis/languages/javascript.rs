//! Brace-delimited extractor for JavaScript and TypeScript.
//!
//! Scope is tracked with a brace-depth profile computed on the stripped copy:
//! module-level declarations are the lines that start at depth zero, class and
//! interface members are the lines one level below their header. Bodies end
//! where the running depth returns to zero.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::analysis::facts::{Callable, FileFacts, ImportDecl, Port, TypeDecl};
use crate::analysis::scan::{
    brace_block_end, count_complexity, delimited_text, depth_profile, find_assignment, header_block_end,
    infer_literal_type, is_constant_name, split_colon_param, split_top_level, squash, BranchStyle,
};
use crate::detect::strip::{strip_lines, Stripped, C_LIKE_SYNTAX};

/// Error names too generic to describe a failure mode.
const GENERIC_ERRORS: &[&str] = &["Error", "any", "unknown"];

/// Modifiers that turn a constructor parameter into a class property.
const PARAM_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Words that can precede `(` in a class body without being a method name.
const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "super", "new", "await",
    "typeof",
];

/// How far ahead an import statement may continue.
const STATEMENT_LOOKAHEAD: usize = 30;

lazy_static! {
    static ref IMPORT_START_RE: Regex = Regex::new(r#"^import(?:\s|\{|\*|['"])"#).unwrap();
    static ref EXPORT_FROM_START_RE: Regex = Regex::new(r"^export\s*(?:type\s*)?(?:\*|\{)").unwrap();
    static ref TS_IMPORT_REQUIRE_RE: Regex = Regex::new(r"^import\s+([\w$]+)\s*=\s*require\(").unwrap();
    static ref FROM_QUOTE_RE: Regex = Regex::new(r#"\bfrom\s*['"]"#).unwrap();
    static ref SIDE_EFFECT_RE: Regex = Regex::new(r#"^\s*import\s*['"]"#).unwrap();
    static ref FROM_SOURCE_RE: Regex = Regex::new(r#"\bfrom\s*['"]([^'"]+)['"]"#).unwrap();
    static ref SIDE_EFFECT_SOURCE_RE: Regex = Regex::new(r#"^\s*import\s*['"]([^'"]+)['"]"#).unwrap();
    static ref REQUIRE_RE: Regex = Regex::new(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
    static ref REQUIRE_BIND_RE: Regex = Regex::new(r"(?:const|let|var)\s+(\{[^}]*\}|[\w$]+)\s*=\s*(?:await\s+)?require\(").unwrap();
    static ref DESTRUCTURE_START_RE: Regex = Regex::new(r"^(?:const|let|var)\s*\{[^}]*$").unwrap();
    static ref DYNAMIC_IMPORT_RE: Regex = Regex::new(r#"\bimport\(\s*['"]([^'"]+)['"]"#).unwrap();

    static ref FUNCTION_RE: Regex = Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(async\s+)?function\s*\*?\s*([\w$]+)\s*(?:<[^(]*>)?\s*\(").unwrap();
    static ref ARROW_RE: Regex = Regex::new(r"^(?:export\s+)?(?:const|let|var)\s+([\w$]+)\s*(?::[^=]+)?=\s*(async\s+)?(?:function\s*\*?\s*[\w$]*\s*\(|(?:<[^>(]*>\s*)?\(|([\w$]+)\s*=>)").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"^(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+([\w$]+)(?:\s*<[^{]*?>)?(?:\s+extends\s+([\w$.]+(?:<[^{]*?>)?))?(?:\s+implements\s+([^{]+))?").unwrap();
    static ref INTERFACE_RE: Regex = Regex::new(r"^(?:export\s+)?(?:declare\s+)?interface\s+([\w$]+)(?:\s*<[^{]*?>)?(?:\s+extends\s+([^{]+))?").unwrap();
    static ref GLOBAL_RE: Regex = Regex::new(r"^(?:export\s+)?(?:const|let|var)\s+([\w$]+)\s*(?::\s*([^=]+?))?\s*=[^=]").unwrap();
    static ref DECORATOR_RE: Regex = Regex::new(r"^@([\w$.]+)(?:\([^)]*\))?\s*").unwrap();

    static ref METHOD_RE: Regex = Regex::new(r"^((?:(?:public|private|protected|static|readonly|abstract|override|async|declare|get|set)\s+)*)(\*?\s*#?[\w$]+)\s*[?!]?\s*(?:<[^(]*>)?\s*\(").unwrap();
    static ref ARROW_FIELD_RE: Regex = Regex::new(r"^((?:(?:public|private|protected|static|readonly|override)\s+)*)(#?[\w$]+)\s*(?::[^=]+)?=\s*(async\s+)?(?:(?:<[^>(]*>\s*)?\(|([\w$]+)\s*=>)").unwrap();
    static ref FIELD_RE: Regex = Regex::new(r"^((?:(?:public|private|protected|static|readonly|abstract|override|declare)\s+)*)(#?[\w$]+)\s*[?!]?\s*(?:[:=;]|$)").unwrap();
    static ref THIS_ATTR_RE: Regex = Regex::new(r"\bthis\.(#?[\w$]+)\s*=[^=]").unwrap();
    static ref RETURN_RE: Regex = Regex::new(r"\)\s*:\s*([^=;{]+?)\s*(?:=>|\{|;|$)").unwrap();

    static ref TRY_RE: Regex = Regex::new(r"(?:^|[^\w$.])try\s*(?:\{|$)").unwrap();
    static ref CATCH_RE: Regex = Regex::new(r"(?:^|[^\w$.])catch\s*(?:\(\s*[\w$]*\s*(?::\s*([\w$.]+))?|\{)").unwrap();
    static ref THROW_NEW_RE: Regex = Regex::new(r"\bthrow\s+new\s+([A-Za-z_$][\w$.]*)").unwrap();
    static ref THROW_BARE_RE: Regex = Regex::new(r"\bthrow\s+([A-Z][\w$]*)\s*(?:;|$)").unwrap();
}

pub fn extract_javascript(lines: &[&str]) -> FileFacts {
    extract_script(lines, false)
}

pub fn extract_typescript(lines: &[&str]) -> FileFacts {
    extract_script(lines, true)
}

/// Extract facts from script lines. `typed` enables interfaces and return annotations.
pub fn extract_script(lines: &[&str], typed: bool) -> FileFacts {
    let stripped = strip_lines(lines, C_LIKE_SYNTAX);
    let view: Vec<&str> = stripped.code.iter().map(String::as_str).collect();
    let depths = depth_profile(&stripped.code, 0, lines.len());
    let mut scan = JsScan {
        lines,
        stripped: &stripped,
        code: &stripped.code,
        view,
        comments: &stripped.comments,
        depths,
        typed,
        facts: FileFacts::new(),
    };
    scan.harvest_imports();
    scan.harvest_errors();
    scan.scan_module();
    scan.facts.finish()
}

/// A parsed callable header with its extent.
struct Parsed {
    callable: Callable,
    /// Constructor parameters declared with a visibility modifier.
    promoted: Vec<Port>,
    header_end: usize,
    end: usize,
}

struct JsScan<'a> {
    lines: &'a [&'a str],
    stripped: &'a Stripped,
    code: &'a [String],
    view: Vec<&'a str>,
    comments: &'a [String],
    depths: Vec<i32>,
    typed: bool,
    facts: FileFacts,
}

impl<'a> JsScan<'a> {
    fn harvest_imports(&mut self) {
        let code: &'a [String] = self.code;
        let mut i = 0;
        while i < code.len() {
            let t = code[i].trim_start();

            if let Some(caps) = TS_IMPORT_REQUIRE_RE.captures(t) {
                if let Some(m) = REQUIRE_RE.captures(self.lines[i]) {
                    self.push_import(&m[1], vec![caps[1].to_string()], false, i, i);
                }
                i += 1;
                continue;
            }

            let is_import = IMPORT_START_RE.is_match(t);
            if is_import || EXPORT_FROM_START_RE.is_match(t) {
                if let Some(end) = self.statement_with_source(i) {
                    let source = FROM_SOURCE_RE
                        .captures(self.lines[end])
                        .or_else(|| SIDE_EFFECT_SOURCE_RE.captures(self.lines[i]))
                        .map(|c| c[1].to_string());
                    if let Some(module) = source {
                        let (names, is_from) = if is_import {
                            let joined = self.view[i..=end].join(" ");
                            parse_import_clause(&joined)
                        } else {
                            (Vec::new(), true)
                        };
                        self.push_import(&module, names, is_from, i, end);
                    }
                    i = end + 1;
                    continue;
                }
            }

            if code[i].contains("require(") || DESTRUCTURE_START_RE.is_match(t) {
                if let Some(end) = self.harvest_require(i) {
                    i = end + 1;
                    continue;
                }
            }

            if code[i].contains("import(") {
                for caps in DYNAMIC_IMPORT_RE.captures_iter(self.lines[i]) {
                    self.facts.imports.push(ImportDecl {
                        module: caps[1].to_string(),
                        names: Vec::new(),
                        is_from: false,
                        line_number: i + 1,
                    });
                }
            }
            i += 1;
        }
    }

    fn push_import(&mut self, module: &str, names: Vec<String>, is_from: bool, start: usize, end: usize) {
        self.facts.imports.push(ImportDecl {
            module: module.to_string(),
            names,
            is_from,
            line_number: start + 1,
        });
        self.facts.note_import(start + 1, end + 1);
    }

    /// Last line of an import/export statement that names a source module.
    fn statement_with_source(&self, i: usize) -> Option<usize> {
        let last = (i + STATEMENT_LOOKAHEAD).min(self.code.len());
        for j in i..last {
            let line = self.code[j].as_str();
            if FROM_QUOTE_RE.is_match(line) || (j == i && SIDE_EFFECT_RE.is_match(line)) {
                return Some(j);
            }
            if line.contains(';') {
                return None;
            }
        }
        None
    }

    /// CommonJS `require` binding starting at `i`. Returns the statement's last line.
    fn harvest_require(&mut self, i: usize) -> Option<usize> {
        let code: &'a [String] = self.code;
        let t = code[i].trim_start();
        let end = if DESTRUCTURE_START_RE.is_match(t) {
            let last = (i + STATEMENT_LOOKAHEAD).min(code.len());
            (i..last).find(|&j| code[j].contains("require("))?
        } else {
            i
        };
        let joined = squash(&self.view[i..=end].join(" "));
        let module = REQUIRE_RE.captures(self.lines[end])?[1].to_string();

        match REQUIRE_BIND_RE.captures(&joined) {
            Some(bind) => {
                let target = &bind[1];
                let (names, is_from) = match target.strip_prefix('{') {
                    Some(inner) => {
                        let names = split_top_level(inner.trim_end_matches('}'), ',')
                            .iter()
                            .map(|p| {
                                let p = p.trim_start_matches("...");
                                p.rsplit(':').next().unwrap_or(p).trim().to_string()
                            })
                            .filter(|p| !p.is_empty())
                            .collect();
                        (names, true)
                    }
                    None => (vec![target.to_string()], false),
                };
                self.push_import(&module, names, is_from, i, end);
            }
            None if t.starts_with("require(") => {
                self.push_import(&module, Vec::new(), false, i, end);
            }
            None => {
                self.facts.imports.push(ImportDecl {
                    module,
                    names: Vec::new(),
                    is_from: false,
                    line_number: i + 1,
                });
            }
        }
        Some(end)
    }

    fn harvest_errors(&mut self) {
        for (i, line) in self.code.iter().enumerate() {
            if TRY_RE.is_match(line) {
                self.facts.add_risk_point(i + 1);
            }
            if let Some(caps) = CATCH_RE.captures(line) {
                self.facts.add_risk_point(i + 1);
                if let Some(t) = caps.get(1) {
                    if !GENERIC_ERRORS.contains(&t.as_str()) {
                        self.facts.add_error_name(t.as_str());
                    }
                }
            }
            let thrown = THROW_NEW_RE
                .captures_iter(line)
                .chain(THROW_BARE_RE.captures_iter(line));
            for caps in thrown {
                if !GENERIC_ERRORS.contains(&&caps[1]) {
                    self.facts.add_error_name(&caps[1]);
                }
            }
        }
    }

    /// Declarations whose header starts at brace depth zero.
    fn scan_module(&mut self) {
        let code: &'a [String] = self.code;
        let mut decorators: Vec<String> = Vec::new();
        let mut i = 0;

        while i < code.len() {
            let t = code[i].trim_start();
            if self.depths[i] != 0 || t.is_empty() || self.facts.import_lines.contains(&(i + 1)) {
                i += 1;
                continue;
            }
            let lead = code[i].len() - t.len();

            if let Some(caps) = DECORATOR_RE.captures(t) {
                decorators.push(caps[1].to_string());
                i += 1;
                continue;
            }

            if let Some(caps) = CLASS_RE.captures(t) {
                let end = self.parse_type(i, &caps, std::mem::take(&mut decorators), false);
                i = end + 1;
                continue;
            }

            if self.typed {
                if let Some(caps) = INTERFACE_RE.captures(t) {
                    let end = self.parse_type(i, &caps, std::mem::take(&mut decorators), true);
                    i = end + 1;
                    continue;
                }
            }

            if let Some(caps) = FUNCTION_RE.captures(t) {
                let open = lead + caps.get(0).map_or(0, |m| m.end() - 1);
                let parsed = self.parse_callable(i, &caps[2], Some(open), caps.get(1).is_some());
                let declaration_only = parsed.end == parsed.header_end && !code[parsed.end].contains('{');
                if !(self.typed && declaration_only) {
                    self.push_callable(parsed.callable, i, parsed.header_end);
                }
                decorators.clear();
                i = parsed.end + 1;
                continue;
            }

            if let Some(caps) = ARROW_RE.captures(t) {
                if let Some(parsed) = self.arrow_at(i, lead, &caps) {
                    self.push_callable(parsed.callable, i, parsed.header_end);
                    decorators.clear();
                    i = parsed.end + 1;
                    continue;
                }
            }

            self.global_at(i, t);
            decorators.clear();
            i += 1;
        }
    }

    fn push_callable(&mut self, callable: Callable, start: usize, header_end: usize) {
        self.facts.note_header(start + 1, header_end + 1);
        self.facts.callables.push(callable);
    }

    /// `name = (..) =>`, `name = x =>` or `name = function (..)` with the
    /// name in capture 1 or 2 and the async marker and bare parameter in the
    /// two captures after it.
    fn arrow_at(&self, i: usize, lead: usize, caps: &Captures) -> Option<Parsed> {
        let (name_idx, async_idx, single_idx) = if caps.len() == 4 { (1, 2, 3) } else { (2, 3, 4) };
        let name = caps.get(name_idx)?.as_str();
        let is_async = caps.get(async_idx).is_some();
        let whole = caps.get(0)?;

        if let Some(single) = caps.get(single_idx) {
            let mut parsed = self.parse_callable(i, name, None, is_async);
            parsed.callable.params = vec![Port::new(single.as_str())];
            return Some(parsed);
        }

        let open = lead + whole.end() - 1;
        let is_function = whole.as_str().contains("function");
        if !is_function {
            let col = self.code[i][..open].chars().count();
            let (_, close) = delimited_text(&self.view, i, col, '(', ')')?;
            if !self.code[close].contains("=>") {
                return None;
            }
        }
        Some(self.parse_callable(i, name, Some(open), is_async))
    }

    /// Parse a callable whose parameter list opens at byte `open` of line `i`.
    fn parse_callable(&self, i: usize, name: &str, open: Option<usize>, is_async: bool) -> Parsed {
        let mut callable = Callable::new(name, i + 1);
        callable.is_async = is_async;
        callable.is_private = name.starts_with('#') || name.starts_with('_');

        let mut promoted = Vec::new();
        let mut header_end = i;
        let mut tail = String::new();

        match open {
            Some(open) => {
                let col = self.paren_column(i, open);
                if let Some((text, end)) = delimited_text(self.lines, i, col, '(', ')') {
                    let (params, props) = parse_params(&text);
                    callable.params = params;
                    promoted = props;
                    header_end = end;
                }
                let from = if header_end == i {
                    self.code[i][..open.min(self.code[i].len())].chars().count()
                } else {
                    0
                };
                tail = body_tail(&self.code[header_end], from, header_end == i);
                if self.typed {
                    if let Some(ret) = RETURN_RE.captures(self.lines[header_end]) {
                        callable.return_type = ret[1].trim().to_string();
                    }
                }
            }
            None => {
                if let Some(p) = self.code[i].find("=>") {
                    tail = self.code[i][p + 2..].to_string();
                }
            }
        }

        let end = header_block_end(self.code, i, header_end).max(header_end);
        let mut body: Vec<&str> = vec![tail.as_str()];
        if end > header_end {
            body.extend(self.view[header_end + 1..=end].iter().copied());
        }
        callable.complexity = count_complexity(&body, BranchStyle::Brace);

        Parsed {
            callable,
            promoted,
            header_end,
            end,
        }
    }

    /// Char column in the original line of the `(` at byte `open` of stripped line `i`.
    fn paren_column(&self, i: usize, open: usize) -> usize {
        let col = self.stripped.original_column(i, open);
        if self.lines[i].chars().nth(col) == Some('(') {
            return col;
        }
        self.lines[i].chars().position(|c| c == '(').unwrap_or(col)
    }

    /// Original line `k` from the char matching byte `lead` of its stripped copy.
    fn original_from(&self, k: usize, lead: usize) -> &'a str {
        let line: &'a str = self.lines[k];
        let col = self.stripped.original_column(k, lead);
        line.char_indices().nth(col).map_or("", |(b, _)| &line[b..])
    }

    /// Class or interface starting at `i`. Returns the line of its closing brace.
    fn parse_type(&mut self, i: usize, caps: &Captures, decorators: Vec<String>, interface: bool) -> usize {
        let code: &'a [String] = self.code;
        let end = brace_block_end(code, i);
        let mut decl = TypeDecl::new(&caps[1], i + 1);
        decl.decorators = decorators;
        if interface {
            if let Some(ext) = caps.get(2) {
                decl.bases = split_top_level(ext.as_str(), ',');
            }
        } else {
            if let Some(ext) = caps.get(2) {
                decl.bases.push(ext.as_str().trim().to_string());
            }
            if let Some(imp) = caps.get(3) {
                decl.bases.extend(split_top_level(imp.as_str(), ','));
            }
        }

        let member_depth = self.depths[i] + 1;
        let mut member_decorators: Vec<String> = Vec::new();
        let mut k = i + 1;
        while k < end {
            if self.depths[k] != member_depth {
                k += 1;
                continue;
            }
            let mut t = code[k].trim_start();
            while let Some(d) = DECORATOR_RE.captures(t) {
                member_decorators.push(d[1].to_string());
                let consumed = d.get(0).map_or(t.len(), |m| m.end());
                t = &t[consumed..];
            }
            if t.trim().is_empty() || t.starts_with('{') || t.starts_with('}') {
                k += 1;
                continue;
            }
            let lead = code[k].len() - t.len();

            if let Some(m) = METHOD_RE.captures(t) {
                let name = m[2].trim_start_matches('*').trim().to_string();
                if !NOT_METHODS.contains(&name.as_str()) {
                    let modifiers = m.get(1).map_or("", |x| x.as_str());
                    let open = lead + m.get(0).map_or(0, |x| x.end() - 1);
                    let mut parsed = self.parse_callable(k, &name, Some(open), modifiers.contains("async"));
                    parsed.callable.is_private |= modifiers.contains("private");
                    parsed.callable.decorators = std::mem::take(&mut member_decorators);
                    if name == "constructor" {
                        for port in parsed.promoted.drain(..) {
                            decl.add_attribute(port);
                        }
                        self.harvest_this_attributes(parsed.header_end + 1, parsed.end, &mut decl);
                    }
                    self.facts.note_header(k + 1, parsed.header_end + 1);
                    decl.methods.push(parsed.callable);
                    k = parsed.end + 1;
                    continue;
                }
            }

            if let Some(m) = ARROW_FIELD_RE.captures(t) {
                if let Some(mut parsed) = self.arrow_at(k, lead, &m) {
                    let modifiers = m.get(1).map_or("", |x| x.as_str());
                    parsed.callable.is_private |= modifiers.contains("private");
                    parsed.callable.decorators = std::mem::take(&mut member_decorators);
                    self.facts.note_header(k + 1, parsed.header_end + 1);
                    decl.methods.push(parsed.callable);
                    k = parsed.end + 1;
                    continue;
                }
            }

            if let Some(m) = FIELD_RE.captures(t) {
                let modifiers = m.get(1).map_or(0, |x| x.end());
                if let Some(port) = self.field_port(k, lead, &t[modifiers..]) {
                    decl.add_attribute(port);
                }
            }
            member_decorators.clear();
            k += 1;
        }

        self.facts.types.push(decl);
        end
    }

    /// Field declaration text without modifiers, e.g. `count: number = 0;`.
    fn field_port(&self, k: usize, lead: usize, text: &str) -> Option<Port> {
        let text = text.trim().trim_end_matches(';').trim_end_matches(',');
        let raw = split_colon_param(text);
        let name = raw.name.trim_end_matches(['?', '!']).trim();
        if name.is_empty() {
            return None;
        }
        let original = self.original_from(k, lead);
        let default = find_assignment(original)
            .map(|eq| cut_comment(&original[eq + 1..], &self.comments[k]))
            .filter(|d| !d.is_empty());

        let mut port = Port::new(name);
        match (raw.type_name, &default) {
            (Some(t), _) => port = port.with_type(t),
            (None, Some(d)) => port = port.with_type(infer_literal_type(d)),
            (None, None) => {}
        }
        if let Some(d) = default {
            port = port.with_default(d);
        }
        Some(port)
    }

    /// `this.x = ...` assignments inside a constructor body.
    fn harvest_this_attributes(&self, from: usize, to: usize, decl: &mut TypeDecl) {
        for idx in from..=to.min(self.code.len().saturating_sub(1)) {
            for caps in THIS_ATTR_RE.captures_iter(&self.code[idx]) {
                let name = &caps[1];
                let original = self.lines[idx];
                let default = original
                    .find(&format!("this.{name}"))
                    .and_then(|pos| {
                        let rest = &original[pos..];
                        find_assignment(rest).map(|eq| cut_comment(&rest[eq + 1..], &self.comments[idx]))
                    })
                    .unwrap_or_default();
                decl.add_attribute(Port::new(name).with_default(default));
            }
        }
    }

    fn global_at(&mut self, i: usize, t: &str) {
        let Some(caps) = GLOBAL_RE.captures(t) else {
            return;
        };
        let name = &caps[1];
        if !is_constant_name(name) {
            return;
        }
        let original = self.lines[i];
        let value = find_assignment(original)
            .map(|eq| cut_comment(&original[eq + 1..], &self.comments[i]))
            .unwrap_or_default();
        let type_name = caps
            .get(2)
            .map(|t| t.as_str().trim().to_string())
            .unwrap_or_else(|| infer_literal_type(&value));
        self.facts
            .globals
            .push(Port::new(name).with_type(type_name).with_default(value));
        self.facts.global_lines.push(i + 1);
    }
}

/// Names bound by an ES import statement (stripped text) and whether it uses braces.
fn parse_import_clause(statement: &str) -> (Vec<String>, bool) {
    let body = statement.trim_start().trim_start_matches("import").trim_start();
    let body = body.strip_prefix("type ").unwrap_or(body);
    let clause = FROM_QUOTE_RE.find(body).map_or("", |m| &body[..m.start()]);

    let (prefix, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(o), Some(c)) if c > o => (format!("{} {}", &clause[..o], &clause[c + 1..]), Some(&clause[o + 1..c])),
        _ => (clause.to_string(), None),
    };

    let mut names = Vec::new();
    for part in prefix.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix('*') {
            Some(ns) => {
                let alias = ns.trim().trim_start_matches("as").trim();
                if !alias.is_empty() {
                    names.push(alias.to_string());
                }
            }
            None => names.push(part.to_string()),
        }
    }

    let is_from = named.is_some();
    for part in named.map(|n| split_top_level(n, ',')).unwrap_or_default() {
        let part = part.strip_prefix("type ").unwrap_or(&part).trim();
        let bound = part.split_once(" as ").map_or(part, |(_, alias)| alias.trim());
        if !bound.is_empty() {
            names.push(bound.to_string());
        }
    }
    (names, is_from)
}

/// Parameters plus the subset declared with a property modifier.
fn parse_params(text: &str) -> (Vec<Port>, Vec<Port>) {
    let mut params = Vec::new();
    let mut promoted = Vec::new();

    for raw in split_top_level(text, ',') {
        let mut rest = raw.as_str();
        while rest.starts_with('@') {
            match rest.find(") ") {
                Some(p) => rest = rest[p + 2..].trim_start(),
                None => break,
            }
        }
        let mut is_property = false;
        while let Some(word) = rest.split_whitespace().next() {
            if !PARAM_MODIFIERS.contains(&word) {
                break;
            }
            is_property = true;
            rest = rest[word.len()..].trim_start();
        }

        let param = split_colon_param(rest);
        let name = squash(param.name.trim_end_matches('?'));
        if name.is_empty() || name == "this" {
            continue;
        }
        let mut port = Port::new(name);
        if let Some(t) = param.type_name {
            port = port.with_type(t);
        }
        if let Some(d) = param.default {
            port = port.with_default(d);
        }
        if is_property {
            promoted.push(port.clone());
        }
        params.push(port);
    }
    (params, promoted)
}

/// Text after the parameter list closes and the body opens (`{` or `=>`).
fn body_tail(line: &str, from_col: usize, same_line: bool) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut depth = if same_line { 0 } else { 1 };
    let mut close = None;
    for (k, c) in chars.iter().enumerate().skip(from_col) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(k);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return String::new();
    };
    let rest: String = chars[close + 1..].iter().collect();
    if let Some(p) = rest.find("=>") {
        return rest[p + 2..].to_string();
    }
    match rest.find('{') {
        Some(p) => rest[p + 1..].to_string(),
        None => String::new(),
    }
}

/// Drop a trailing `// comment` and statement terminator from a value.
fn cut_comment(text: &str, comment: &str) -> String {
    let text = if comment.is_empty() {
        text
    } else {
        text.rfind("//").map_or(text, |p| &text[..p])
    };
    text.trim().trim_end_matches([';', ',']).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn js(src: &str) -> FileFacts {
        let lines: Vec<&str> = src.lines().collect();
        extract_javascript(&lines)
    }

    fn ts(src: &str) -> FileFacts {
        let lines: Vec<&str> = src.lines().collect();
        extract_typescript(&lines)
    }

    #[test]
    fn test_es_imports() {
        let facts = js("import React, { useState, useEffect as effect } from 'react';\nimport * as path from \"path\";\nimport './styles.css';\nimport {\n  a,\n  b\n} from '@scope/pkg';\n");
        assert_eq!(facts.imports.len(), 4);
        assert_eq!(facts.imports[0].module, "react");
        assert_eq!(facts.imports[0].names, vec!["React", "useState", "effect"]);
        assert!(facts.imports[0].is_from);
        assert_eq!(facts.imports[1].names, vec!["path"]);
        assert!(!facts.imports[1].is_from);
        assert_eq!(facts.imports[2].module, "./styles.css");
        assert!(facts.imports[2].names.is_empty());
        assert_eq!(facts.imports[3].module, "@scope/pkg");
        assert_eq!(facts.imports[3].names, vec!["a", "b"]);
        assert_eq!(facts.imports[3].line_number, 4);
        assert!(facts.import_lines.contains(&7));
    }

    #[test]
    fn test_require_imports() {
        let facts = js("const fs = require('fs');\nconst { join, resolve: res } = require(\"path\");\nrequire('dotenv').config();\n");
        assert_eq!(facts.imports.len(), 3);
        assert_eq!(facts.imports[0].names, vec!["fs"]);
        assert!(!facts.imports[0].is_from);
        assert_eq!(facts.imports[1].names, vec!["join", "res"]);
        assert!(facts.imports[1].is_from);
        assert_eq!(facts.imports[2].module, "dotenv");
    }

    #[test]
    fn test_functions_and_arrows() {
        let src = "\
export async function load(url, { retries = 3 } = {}) {
  if (!url) {
    throw new ValidationError('missing');
  }
  return fetch(url);
}
const double = x => x * 2;
export const pick = async (items, key = 'id') => {
  return items.map(i => i[key] ? i[key] : null);
};
const total = (a + b) * 2;
";
        let facts = js(src);
        let names: Vec<&str> = facts.callables.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["load", "double", "pick"]);
        let load = &facts.callables[0];
        assert!(load.is_async);
        assert_eq!(load.params.len(), 2);
        assert_eq!(load.complexity, 1);
        assert_eq!(facts.callables[1].params[0].name, "x");
        let pick = &facts.callables[2];
        assert!(pick.is_async);
        assert_eq!(pick.params[1].default.as_deref(), Some("'id'"));
        assert_eq!(pick.complexity, 1);
        assert_eq!(facts.error_names, vec!["ValidationError"]);
    }

    #[test]
    fn test_literal_braces_do_not_break_body() {
        let src = "\
function render() {
  const s = \"{ not a real brace }\";
  return s;
}
function after() {
  return 1;
}
";
        let facts = js(src);
        assert_eq!(facts.callables.len(), 2);
        assert_eq!(facts.callables[1].name, "after");
        assert_eq!(facts.callables[1].line_number, 5);
    }

    #[test]
    fn test_class_members() {
        let src = "\
export class Store extends Base {
  count = 0;
  #secret = 'x';
  constructor(name) {
    super();
    this.name = name;
  }
  async load() {
    try {
      return await this.fetch();
    } catch (err) {
      return null;
    }
  }
  _reset() {}
  handle = (event) => {
    this.count++;
  };
}
";
        let facts = js(src);
        let t = &facts.types[0];
        assert_eq!(t.name, "Store");
        assert_eq!(t.bases, vec!["Base"]);
        let methods: Vec<&str> = t.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["constructor", "load", "_reset", "handle"]);
        assert!(t.methods[1].is_async);
        assert!(t.methods[2].is_private);
        let attrs: Vec<&str> = t.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["count", "#secret", "name"]);
        assert_eq!(t.attributes[0].type_name, "integer");
        assert_eq!(facts.risk_points, vec![9, 11]);
        assert!(facts.callables.is_empty());
    }

    #[test]
    fn test_typescript_signatures() {
        let src = "\
import type { Config } from './config';
export interface Repo extends Base<T>, Other {
  readonly id: number;
  find(id: string): Promise<Item>;
}
export class Service implements Repo {
  constructor(private readonly client: HttpClient, public name?: string) {}
  @Log()
  public async find(id: string, opts: Options = {}): Promise<Item> {
    return this.client.get(id);
  }
}
export function helper(a: number): string;
export function helper(a: any): string {
  return String(a);
}
const MAX_RETRIES: number = 5;
";
        let facts = ts(src);
        assert_eq!(facts.imports[0].names, vec!["Config"]);
        let repo = &facts.types[0];
        assert_eq!(repo.name, "Repo");
        assert_eq!(repo.bases, vec!["Base<T>", "Other"]);
        assert_eq!(repo.attributes[0].name, "id");
        assert_eq!(repo.attributes[0].type_name, "number");
        assert_eq!(repo.methods[0].return_type, "Promise<Item>");

        let service = &facts.types[1];
        assert_eq!(service.bases, vec!["Repo"]);
        let attrs: Vec<&str> = service.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["client", "name"]);
        let find = &service.methods[1];
        assert_eq!(find.decorators, vec!["Log"]);
        assert!(find.is_async);
        assert_eq!(find.params[0].type_name, "string");
        assert_eq!(find.params[1].default.as_deref(), Some("{}"));
        assert_eq!(find.return_type, "Promise<Item>");

        assert_eq!(facts.callables.len(), 1);
        assert_eq!(facts.callables[0].line_number, 14);
        assert_eq!(facts.globals[0].name, "MAX_RETRIES");
        assert_eq!(facts.globals[0].type_name, "number");
    }

    #[test]
    fn test_ternary_complexity() {
        let facts = js("function f(a) {\n  switch (a) {\n    case 1: return a > 0 ? 1 : 2;\n  }\n}\n");
        assert_eq!(facts.callables[0].complexity, 3);
    }

    #[test]
    fn test_long_destructured_header() {
        let mut src = String::from("function Card({\n");
        for k in 0..14 {
            src.push_str(&format!("  prop{k},\n"));
        }
        src.push_str("}) {\n  if (prop0) {\n    open();\n  }\n  if (prop1) {\n    close();\n  }\n  return prop2 ? 1 : 2;\n}\nfunction next() {}\n");
        let facts = js(&src);
        let names: Vec<&str> = facts.callables.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Card", "next"]);
        assert_eq!(facts.callables[0].complexity, 3);
    }

    #[test]
    fn test_decorator_literal_on_method_line() {
        let src = "\
export class ItemsController {
  @Get(':id') findOne(id: string) {
    return this.items.get(id);
  }
}
";
        let facts = ts(src);
        let find = &facts.types[0].methods[0];
        assert_eq!(find.name, "findOne");
        assert_eq!(find.decorators, vec!["Get"]);
        let params: Vec<&str> = find.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["id"]);
        assert_eq!(find.params[0].type_name, "string");
    }
}
