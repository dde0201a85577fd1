//! Brace-delimited extractor with namespace imports (PHP).
//!
//! `use` statements at file level are imports; inside a class body they are
//! trait uses and become bases. Files with a braced `namespace X { ... }`
//! block are scanned one level deeper.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::analysis::facts::{Callable, FileFacts, ImportDecl, Port, TypeDecl};
use crate::analysis::scan::{
    brace_block_end, count_complexity, delimited_text, depth_profile, find_assignment,
    infer_literal_type, split_top_level, squash, BranchStyle,
};
use crate::detect::strip::{strip_lines, Stripped, PHP_SYNTAX};

const GENERIC_ERRORS: &[&str] = &["Exception", "Throwable", "Error"];

const PROPERTY_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly"];

const STATEMENT_LOOKAHEAD: usize = 30;

lazy_static! {
    static ref NAMESPACE_BLOCK_RE: Regex = Regex::new(r"^namespace\b[^;{]*\{").unwrap();
    static ref USE_RE: Regex = Regex::new(r"^use\s+").unwrap();
    static ref USE_KIND_RE: Regex = Regex::new(r"^use\s+(?:(?:function|const)\s+)?").unwrap();
    static ref USE_ITEM_RE: Regex = Regex::new(r"^\\?([\w\\]+)(?:\s+as\s+(\w+))?$").unwrap();
    static ref INCLUDE_RE: Regex = Regex::new(r"^(?:require|require_once|include|include_once)\b").unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#"['"]([^'"]+)['"]"#).unwrap();

    static ref FUNCTION_RE: Regex = Regex::new(r"^function\s+&?\s*([A-Za-z_]\w*)\s*\(").unwrap();
    static ref TYPE_RE: Regex = Regex::new(r"^(?:(?:abstract|final|readonly)\s+)*(class|interface|trait|enum)\s+([A-Za-z_]\w*)(?:\s*:\s*\w+)?(?:\s+extends\s+([\w\\]+(?:\s*,\s*[\w\\]+)*))?(?:\s+implements\s+([\w\\,\s]+))?").unwrap();
    static ref CONST_RE: Regex = Regex::new(r"^(?:(?:public|private|protected|final)\s+)*const\s+(?:[\w\\?]+\s+)?([A-Za-z_]\w*)\s*=").unwrap();
    static ref DEFINE_RE: Regex = Regex::new(r#"^\s*define\(\s*['"]([A-Za-z_]\w*)['"]\s*,\s*(.+?)\s*\)\s*;"#).unwrap();
    static ref ATTRIBUTE_RE: Regex = Regex::new(r"^#\[\s*\\?([\w\\]+)").unwrap();

    static ref METHOD_RE: Regex = Regex::new(r"^((?:(?:public|private|protected|static|abstract|final)\s+)*)function\s+&?\s*([A-Za-z_]\w*)\s*\(").unwrap();
    static ref PROPERTY_RE: Regex = Regex::new(r"^((?:(?:public|private|protected|static|readonly|var)\s+)+)(\??[\w\\|]+\s+)?\$(\w+)").unwrap();
    static ref CASE_RE: Regex = Regex::new(r"^case\s+([A-Za-z_]\w*)\s*(?:=|;)").unwrap();
    static ref TRAIT_USE_RE: Regex = Regex::new(r"^use\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)\s*[;{]").unwrap();
    static ref RETURN_RE: Regex = Regex::new(r"\)\s*:\s*([^{;]+?)\s*(?:\{|;|$)").unwrap();

    static ref TRY_RE: Regex = Regex::new(r"\btry\s*(?:\{|$)").unwrap();
    static ref CATCH_RE: Regex = Regex::new(r"\bcatch\s*\(\s*([^)$]+?)\s*(?:\$\w+)?\s*\)").unwrap();
    static ref THROW_RE: Regex = Regex::new(r"\bthrow\s+new\s+\\?([\w\\]+)").unwrap();
}

/// Extract facts from PHP source lines.
pub fn extract(lines: &[&str]) -> FileFacts {
    let stripped = strip_lines(lines, PHP_SYNTAX);
    let view: Vec<&str> = stripped.code.iter().map(String::as_str).collect();
    let depths = depth_profile(&stripped.code, 0, lines.len());
    let mut scan = PhpScan {
        lines,
        stripped: &stripped,
        code: &stripped.code,
        view,
        comments: &stripped.comments,
        depths,
        facts: FileFacts::new(),
    };
    scan.harvest_errors();
    scan.scan_file();
    scan.facts.finish()
}

struct PhpScan<'a> {
    lines: &'a [&'a str],
    stripped: &'a Stripped,
    code: &'a [String],
    view: Vec<&'a str>,
    comments: &'a [String],
    depths: Vec<i32>,
    facts: FileFacts,
}

impl<'a> PhpScan<'a> {
    fn harvest_errors(&mut self) {
        for (i, line) in self.code.iter().enumerate() {
            if TRY_RE.is_match(line) {
                self.facts.add_risk_point(i + 1);
            }
            if let Some(caps) = CATCH_RE.captures(line) {
                self.facts.add_risk_point(i + 1);
                for name in caps[1].split('|') {
                    let name = name.trim().trim_start_matches('\\');
                    if !name.is_empty() && !GENERIC_ERRORS.contains(&name) {
                        self.facts.add_error_name(name);
                    }
                }
            }
            for caps in THROW_RE.captures_iter(line) {
                let name = &caps[1];
                if !GENERIC_ERRORS.contains(&name) {
                    self.facts.add_error_name(name);
                }
            }
        }
    }

    /// File-level statements and declarations.
    fn scan_file(&mut self) {
        let code: &'a [String] = self.code;
        let mut level = 0;
        let mut namespace_end = 0;
        let mut attributes: Vec<String> = Vec::new();
        let mut i = 0;

        while i < code.len() {
            if level > 0 && i > namespace_end {
                level = 0;
            }
            let t = code[i].trim_start();
            if self.depths[i] != level || t.is_empty() {
                i += 1;
                continue;
            }

            if level == 0 && NAMESPACE_BLOCK_RE.is_match(t) {
                level = 1;
                namespace_end = brace_block_end(code, i);
                i += 1;
                continue;
            }

            let t = take_attributes(t, &mut attributes);
            if t.is_empty() {
                i += 1;
                continue;
            }

            if USE_RE.is_match(t) {
                i = self.parse_use(i) + 1;
                continue;
            }

            if INCLUDE_RE.is_match(t) {
                self.parse_include(i);
                i += 1;
                continue;
            }

            if let Some(caps) = TYPE_RE.captures(t) {
                i = self.parse_type(i, &caps, std::mem::take(&mut attributes)) + 1;
                continue;
            }

            if let Some(caps) = FUNCTION_RE.captures(t) {
                let lead = code[i].len() - t.len();
                let open = lead + caps.get(0).map_or(0, |m| m.end() - 1);
                let mut parsed = self.parse_callable(i, &caps[1], open);
                parsed.callable.decorators = std::mem::take(&mut attributes);
                self.facts.note_header(i + 1, parsed.header_end + 1);
                self.facts.callables.push(parsed.callable);
                i = parsed.end + 1;
                continue;
            }

            if CONST_RE.is_match(t) || t.starts_with("define(") {
                self.parse_global(i, t);
            }
            attributes.clear();
            i += 1;
        }
    }

    /// `use` import statement. Returns its last line.
    fn parse_use(&mut self, i: usize) -> usize {
        let last = (i + STATEMENT_LOOKAHEAD).min(self.code.len());
        let end = (i..last)
            .find(|&j| self.code[j].contains(';'))
            .unwrap_or(i);
        let joined = squash(&self.view[i..=end].join(" "));
        let statement = joined.trim_end().trim_end_matches(';');
        let body = USE_KIND_RE
            .find(statement)
            .map_or(statement, |m| &statement[m.end()..]);

        match (body.find('{'), body.rfind('}')) {
            (Some(open), Some(close)) if close > open => {
                let prefix = body[..open].trim().trim_end_matches('\\').trim_start_matches('\\');
                let names = split_top_level(&body[open + 1..close], ',')
                    .iter()
                    .filter_map(|item| {
                        let item = item
                            .strip_prefix("function ")
                            .or_else(|| item.strip_prefix("const "))
                            .unwrap_or(item);
                        USE_ITEM_RE.captures(item.trim()).map(|c| bound_name(&c))
                    })
                    .collect();
                self.facts.imports.push(ImportDecl {
                    module: prefix.to_string(),
                    names,
                    is_from: true,
                    line_number: i + 1,
                });
            }
            _ => {
                for item in split_top_level(body, ',') {
                    if let Some(c) = USE_ITEM_RE.captures(&item) {
                        self.facts.imports.push(ImportDecl {
                            module: c[1].to_string(),
                            names: vec![bound_name(&c)],
                            is_from: false,
                            line_number: i + 1,
                        });
                    }
                }
            }
        }
        self.facts.note_import(i + 1, end + 1);
        end
    }

    /// `require_once __DIR__ . '/x.php';` and friends.
    fn parse_include(&mut self, i: usize) {
        let original = self.lines[i];
        let Some(literal) = QUOTED_RE.captures(original) else {
            return;
        };
        let module = if original.contains("__DIR__") {
            format!("__DIR__{}", &literal[1])
        } else {
            literal[1].to_string()
        };
        self.facts.imports.push(ImportDecl {
            module,
            names: Vec::new(),
            is_from: false,
            line_number: i + 1,
        });
        self.facts.note_import(i + 1, i + 1);
    }

    fn parse_global(&mut self, i: usize, t: &str) {
        let original = self.lines[i];
        if let Some(caps) = DEFINE_RE.captures(original) {
            let value = caps[2].to_string();
            self.facts
                .globals
                .push(Port::new(&caps[1]).with_type(infer_literal_type(&value)).with_default(value));
            self.facts.global_lines.push(i + 1);
            return;
        }
        let Some(caps) = CONST_RE.captures(t) else {
            return;
        };
        let value = find_assignment(original)
            .map(|eq| cut_comment(&original[eq + 1..], &self.comments[i]))
            .unwrap_or_default();
        self.facts
            .globals
            .push(Port::new(&caps[1]).with_type(infer_literal_type(&value)).with_default(value));
        self.facts.global_lines.push(i + 1);
    }

    fn parse_callable(&self, i: usize, name: &str, open: usize) -> Parsed {
        let mut callable = Callable::new(name, i + 1);
        callable.is_private = name.starts_with('_') && !name.starts_with("__");

        let col = self.stripped.original_column(i, open);
        let mut header_end = i;
        let mut promoted = Vec::new();
        if let Some((text, end)) = delimited_text(self.lines, i, col, '(', ')') {
            let (params, props) = parse_params(&text);
            callable.params = params;
            promoted = props;
            header_end = end;
        }
        if let Some(ret) = RETURN_RE.captures(self.lines[header_end]) {
            callable.return_type = ret[1].trim().to_string();
        }

        let end = brace_block_end(self.code, header_end).max(header_end);
        let tail = self.code[header_end]
            .rfind('{')
            .map_or("", |p| &self.code[header_end][p + 1..]);
        let mut body: Vec<&str> = vec![tail];
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

    /// Class, interface, trait or enum starting at `i`. Returns its last line.
    fn parse_type(&mut self, i: usize, caps: &Captures, attributes: Vec<String>) -> usize {
        let code: &'a [String] = self.code;
        let end = brace_block_end(code, i);
        let mut decl = TypeDecl::new(&caps[2], i + 1);
        decl.decorators = attributes;
        for group in [caps.get(3), caps.get(4)].into_iter().flatten() {
            decl.bases.extend(
                split_top_level(group.as_str(), ',')
                    .into_iter()
                    .map(|b| b.trim_start_matches('\\').to_string()),
            );
        }

        let member_depth = self.depths[i] + 1;
        let mut member_attributes: Vec<String> = Vec::new();
        let mut k = i + 1;
        while k < end {
            let t = code[k].trim_start();
            if self.depths[k] != member_depth || t.is_empty() {
                k += 1;
                continue;
            }
            let t = take_attributes(t, &mut member_attributes);
            if t.is_empty() {
                k += 1;
                continue;
            }
            let lead = code[k].len() - t.len();

            if let Some(m) = METHOD_RE.captures(t) {
                let modifiers = m.get(1).map_or("", |x| x.as_str());
                let open = lead + m.get(0).map_or(0, |x| x.end() - 1);
                let mut parsed = self.parse_callable(k, &m[2], open);
                parsed.callable.is_private |= modifiers.contains("private");
                parsed.callable.decorators = std::mem::take(&mut member_attributes);
                if &m[2] == "__construct" {
                    for port in parsed.promoted.drain(..) {
                        decl.add_attribute(port);
                    }
                }
                self.facts.note_header(k + 1, parsed.header_end + 1);
                decl.methods.push(parsed.callable);
                k = parsed.end + 1;
                continue;
            }

            if let Some(m) = TRAIT_USE_RE.captures(t) {
                decl.bases.extend(
                    split_top_level(&m[1], ',')
                        .into_iter()
                        .map(|b| b.trim_start_matches('\\').to_string()),
                );
            } else if let Some(m) = PROPERTY_RE.captures(t) {
                let mut port = Port::new(&m[3]);
                if let Some(ty) = m.get(2) {
                    port = port.with_type(ty.as_str());
                }
                if let Some(default) = self.default_at(k, &format!("${}", &m[3])) {
                    if m.get(2).is_none() {
                        port = port.with_type(infer_literal_type(&default));
                    }
                    port = port.with_default(default);
                }
                decl.add_attribute(port);
            } else if let Some(m) = CONST_RE.captures(t) {
                let default = self.default_at(k, &m[1]).unwrap_or_default();
                decl.add_attribute(
                    Port::new(&m[1])
                        .with_type(infer_literal_type(&default))
                        .with_default(default),
                );
            } else if let Some(m) = CASE_RE.captures(t) {
                let default = self.default_at(k, &m[1]).unwrap_or_default();
                decl.add_attribute(Port::new(&m[1]).with_default(default));
            }
            member_attributes.clear();
            k += 1;
        }

        self.facts.types.push(decl);
        end
    }

    /// Value assigned after `anchor` on original line `k`.
    fn default_at(&self, k: usize, anchor: &str) -> Option<String> {
        let original = self.lines[k];
        let rest = &original[original.find(anchor)?..];
        let eq = find_assignment(rest)?;
        Some(cut_comment(&rest[eq + 1..], &self.comments[k])).filter(|v| !v.is_empty())
    }
}

struct Parsed {
    callable: Callable,
    promoted: Vec<Port>,
    header_end: usize,
    end: usize,
}

/// Record leading `#[...]` attribute groups and return the text after them.
///
/// An attribute still open at the end of the line consumes the whole line.
fn take_attributes<'t>(mut t: &'t str, names: &mut Vec<String>) -> &'t str {
    while let Some(caps) = ATTRIBUTE_RE.captures(t) {
        names.push(caps[1].to_string());
        let mut depth = 0;
        let close = t.char_indices().find_map(|(b, c)| {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(b + 1);
                    }
                }
                _ => {}
            }
            None
        });
        match close {
            Some(end) => t = t[end..].trim_start(),
            None => return "",
        }
    }
    t
}

fn bound_name(caps: &Captures) -> String {
    match caps.get(2) {
        Some(alias) => alias.as_str().to_string(),
        None => caps[1].rsplit('\\').next().unwrap_or(&caps[1]).to_string(),
    }
}

/// `?Type $name = default` parameters plus the promoted subset.
fn parse_params(text: &str) -> (Vec<Port>, Vec<Port>) {
    let mut params = Vec::new();
    let mut promoted = Vec::new();

    for raw in split_top_level(text, ',') {
        let mut rest = raw.as_str();
        while rest.starts_with("#[") {
            match rest.find(']') {
                Some(p) => rest = rest[p + 1..].trim_start(),
                None => break,
            }
        }
        let mut is_property = false;
        while let Some(word) = rest.split_whitespace().next() {
            if !PROPERTY_MODIFIERS.contains(&word) {
                break;
            }
            is_property = true;
            rest = rest[word.len()..].trim_start();
        }

        let (head, default) = match find_assignment(rest) {
            Some(eq) => (&rest[..eq], Some(rest[eq + 1..].trim())),
            None => (rest, None),
        };
        let Some(dollar) = head.find('$') else {
            continue;
        };
        let type_part = head[..dollar].trim();
        let rest_marker = type_part.ends_with("...");
        let type_name = type_part.trim_end_matches("...").trim_end_matches('&').trim();
        let name = head[dollar + 1..].trim();
        if name.is_empty() {
            continue;
        }

        let name = if rest_marker { format!("...{name}") } else { name.to_string() };
        let mut port = Port::new(name).with_type(type_name);
        if let Some(d) = default {
            port = port.with_default(d);
        }
        if is_property {
            promoted.push(port.clone());
        }
        params.push(port);
    }
    (params, promoted)
}

fn cut_comment(text: &str, comment: &str) -> String {
    let text = if comment.is_empty() {
        text
    } else {
        let cut = [text.rfind("//"), text.rfind('#')].into_iter().flatten().min();
        cut.map_or(text, |p| &text[..p])
    };
    text.trim().trim_end_matches([';', ',']).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> FileFacts {
        let lines: Vec<&str> = src.lines().collect();
        extract(&lines)
    }

    #[test]
    fn test_use_statements() {
        let src = "\
<?php
namespace App\\Http;

use Illuminate\\Support\\Str;
use GuzzleHttp\\Client as Http, Monolog\\Logger;
use Symfony\\Component\\{Console\\Command, Process\\Process as Proc};
require_once __DIR__ . '/helpers.php';
";
        let facts = run(src);
        let modules: Vec<&str> = facts.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(
            modules,
            vec![
                "Illuminate\\Support\\Str",
                "GuzzleHttp\\Client",
                "Monolog\\Logger",
                "Symfony\\Component",
                "__DIR__/helpers.php",
            ]
        );
        assert_eq!(facts.imports[0].names, vec!["Str"]);
        assert_eq!(facts.imports[1].names, vec!["Http"]);
        assert!(!facts.imports[1].is_from);
        assert_eq!(facts.imports[3].names, vec!["Command", "Proc"]);
        assert!(facts.imports[3].is_from);
    }

    #[test]
    fn test_class_members() {
        let src = "\
<?php
final class UserService extends BaseService implements Loggable, Countable
{
    use HasEvents;

    public const MAX_USERS = 100;
    private ?string $name = null;
    protected array $items = [];

    public function __construct(private readonly UserRepo $repo, int $limit = 10)
    {
    }

    #[Route('/users')]
    public function list(string ...$filters): array
    {
        foreach ($filters as $f) {
            if ($f === '') {
                continue;
            }
        }
        return [];
    }

    private function normalize(&$value) {}
}
";
        let facts = run(src);
        let t = &facts.types[0];
        assert_eq!(t.name, "UserService");
        assert_eq!(t.line_number, 2);
        assert_eq!(t.bases, vec!["BaseService", "Loggable", "Countable", "HasEvents"]);
        let attrs: Vec<&str> = t.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["MAX_USERS", "name", "items", "repo"]);
        assert_eq!(t.attributes[0].type_name, "integer");
        assert_eq!(t.attributes[1].type_name, "?string");
        assert_eq!(t.attributes[3].type_name, "UserRepo");

        let methods: Vec<&str> = t.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["__construct", "list", "normalize"]);
        let list = &t.methods[1];
        assert_eq!(list.params[0].name, "...filters");
        assert_eq!(list.params[0].type_name, "string");
        assert_eq!(list.return_type, "array");
        assert_eq!(list.decorators, vec!["Route"]);
        assert_eq!(list.complexity, 2);
        assert!(t.methods[2].is_private);
        assert_eq!(t.methods[2].params[0].name, "value");
    }

    #[test]
    fn test_functions_errors_and_globals() {
        let src = "\
<?php
const API_VERSION = 'v2';
define('MAX_RETRY', 3);

function load(string $path): string {
    try {
        return file_get_contents($path);
    } catch (NotFoundException | \\RuntimeException $e) {
        throw new ConfigException('bad');
    } catch (\\Exception $e) {
        throw new \\Exception('x');
    }
}
";
        let facts = run(src);
        assert_eq!(facts.callables.len(), 1);
        assert_eq!(facts.callables[0].name, "load");
        assert_eq!(facts.callables[0].params[0].name, "path");
        assert_eq!(facts.callables[0].return_type, "string");
        assert_eq!(facts.error_names, vec!["NotFoundException", "RuntimeException", "ConfigException"]);
        assert_eq!(facts.risk_points, vec![6, 8, 10]);
        let globals: Vec<(&str, &str)> = facts
            .globals
            .iter()
            .map(|g| (g.name.as_str(), g.type_name.as_str()))
            .collect();
        assert_eq!(globals, vec![("API_VERSION", "string"), ("MAX_RETRY", "integer")]);
    }

    #[test]
    fn test_interface_and_enum() {
        let src = "\
<?php
interface Shape extends Countable
{
    public function area(): float;
}
enum Status: string
{
    case Active = 'active';
    case Inactive = 'inactive';
}
";
        let facts = run(src);
        assert_eq!(facts.types.len(), 2);
        assert_eq!(facts.types[0].methods[0].name, "area");
        assert_eq!(facts.types[0].methods[0].return_type, "float");
        let cases: Vec<&str> = facts.types[1].attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(cases, vec!["Active", "Inactive"]);
    }

    #[test]
    fn test_attribute_on_method_line() {
        let src = "\
<?php
class PageController
{
    #[Route('/x')] public function show(int $id): Response
    {
        if ($id < 0) {
            throw new NotFound();
        }
        return new Response();
    }

    #[Pure] #[Deprecated(reason: 'old')] private function legacy() {}
}
";
        let facts = run(src);
        let t = &facts.types[0];
        let methods: Vec<&str> = t.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["show", "legacy"]);
        let show = &t.methods[0];
        assert_eq!(show.decorators, vec!["Route"]);
        assert_eq!(show.params[0].name, "id");
        assert_eq!(show.params[0].type_name, "int");
        assert_eq!(show.return_type, "Response");
        assert_eq!(show.complexity, 1);
        assert_eq!(t.methods[1].decorators, vec!["Pure", "Deprecated"]);
        assert!(t.methods[1].is_private);
    }

    #[test]
    fn test_inline_html_between_blocks() {
        let src = "\
<?php
function header_html() {
    return 1;
}
?>
<p>Don't panic</p>
<?php
function footer_html() {
    return 2;
}
";
        let facts = run(src);
        let names: Vec<&str> = facts.callables.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["header_html", "footer_html"]);
        assert_eq!(facts.callables[1].line_number, 8);
    }
}
