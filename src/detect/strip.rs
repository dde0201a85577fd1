//! Comment and string-literal stripping.
//!
//! Produces a working copy of the source where comments are removed and the
//! contents of string literals are emptied (delimiters are kept). Line count
//! is preserved and characters outside literals are untouched, so brace depth
//! and word searches on the stripped copy see only real code. Original lines
//! stay the source of truth for line numbers and literal values. PHP text
//! after a `?>` close tag is neither code nor comment until the next open tag.

use crate::analysis::languages::{html, Language};

/// Comment and quoting conventions of a language family.
#[derive(Debug, Clone, Copy)]
pub struct CommentSyntax {
    /// Single-line comment openers.
    pub line: &'static [&'static str],
    /// Block comment delimiters.
    pub block: Option<(&'static str, &'static str)>,
    /// Characters that open a string literal.
    pub quotes: &'static [char],
    /// Whether `"""`/`'''` open triple-quoted literals.
    pub triple_quotes: bool,
    /// Quote characters whose literals may continue past the end of a line.
    pub multiline_quotes: &'static [char],
    /// Whether `?>` leaves code for inline text until the next open tag.
    pub template_tags: bool,
}

pub const PYTHON_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: None,
    quotes: &['"', '\''],
    triple_quotes: true,
    multiline_quotes: &[],
    template_tags: false,
};

pub const C_LIKE_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\'', '`'],
    triple_quotes: false,
    multiline_quotes: &['`'],
    template_tags: false,
};

pub const PHP_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//", "#"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\''],
    triple_quotes: false,
    multiline_quotes: &['"', '\''],
    template_tags: true,
};

pub const MARKUP_SYNTAX: CommentSyntax = CommentSyntax {
    line: &[],
    block: Some(("<!--", "-->")),
    quotes: &[],
    triple_quotes: false,
    multiline_quotes: &[],
    template_tags: false,
};

const CLOSE_TAG: &str = "?>";
const OPEN_TAGS: &[&str] = &["<?php", "<?="];

impl CommentSyntax {
    /// Syntax used for a language.
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => PYTHON_SYNTAX,
            Language::Php => PHP_SYNTAX,
            Language::Html => MARKUP_SYNTAX,
            Language::JavaScript | Language::TypeScript | Language::Unknown => C_LIKE_SYNTAX,
        }
    }
}

/// Stripped working copy of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stripped {
    /// Code with comments removed and literal contents emptied.
    pub code: Vec<String>,
    /// Comment text found on each line.
    pub comments: Vec<String>,
    /// Whether each line carries code outside comments and literal contents.
    pub code_mask: Vec<bool>,
    /// Char column in the original line of every char of `code`.
    pub origin: Vec<Vec<usize>>,
    /// Original lines with comment text and comment markers blanked to spaces.
    pub uncommented: Vec<String>,
}

impl Stripped {
    /// Number of non-blank, non-comment, non-docstring lines.
    pub fn code_line_count(&self) -> usize {
        self.code_mask.iter().filter(|m| **m).count()
    }

    /// Stripped line by 0-based index, empty when out of range.
    pub fn line(&self, idx: usize) -> &str {
        self.code.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Char column in original line `idx` of the char at byte `byte` of its stripped copy.
    pub fn original_column(&self, idx: usize, byte: usize) -> usize {
        let code = self.line(idx);
        let k = code.get(..byte).unwrap_or(code).chars().count();
        self.origin
            .get(idx)
            .and_then(|cols| cols.get(k))
            .copied()
            .unwrap_or(k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Block,
    Str { quote: char, triple: bool },
    /// Text between `?>` and the next open tag.
    Inline,
}

/// Strip a file according to its language, including embedded script regions.
pub fn strip_source(lines: &[&str], language: Language) -> Stripped {
    if language != Language::Html {
        return strip_lines(lines, CommentSyntax::for_language(language));
    }

    let mut markup = strip_lines(lines, MARKUP_SYNTAX);
    let script_lines = html::script_view(lines);
    let views: Vec<&str> = script_lines
        .iter()
        .map(|l| l.as_deref().unwrap_or(""))
        .collect();
    let script = strip_lines(&views, C_LIKE_SYNTAX);

    for (idx, view) in script_lines.iter().enumerate() {
        let Some(view) = view else {
            continue;
        };
        markup.code[idx] = script.code[idx].clone();
        markup.comments[idx] = script.comments[idx].clone();
        markup.code_mask[idx] = markup.code_mask[idx] || script.code_mask[idx];
        markup.origin[idx] = script.origin[idx].clone();
        // Characters the script view kept come from the script pass.
        markup.uncommented[idx] = lines[idx]
            .chars()
            .zip(view.chars())
            .zip(script.uncommented[idx].chars().zip(markup.uncommented[idx].chars()))
            .map(|((orig, seen), (from_script, from_markup))| {
                if orig == seen {
                    from_script
                } else {
                    from_markup
                }
            })
            .collect();
    }
    markup
}

/// One stripped line under construction.
#[derive(Default)]
struct LineOut {
    code: String,
    origin: Vec<usize>,
    comment: String,
    has_code: bool,
}

impl LineOut {
    fn keep(&mut self, c: char, col: usize) {
        self.code.push(c);
        self.origin.push(col);
    }

    fn keep_str(&mut self, s: &str, col: usize) {
        for (k, c) in s.chars().enumerate() {
            self.keep(c, col + k);
        }
    }
}

/// Strip lines with an explicit comment syntax.
pub fn strip_lines(lines: &[&str], syntax: CommentSyntax) -> Stripped {
    let mut out = Stripped {
        code: Vec::with_capacity(lines.len()),
        comments: Vec::with_capacity(lines.len()),
        code_mask: Vec::with_capacity(lines.len()),
        origin: Vec::with_capacity(lines.len()),
        uncommented: Vec::with_capacity(lines.len()),
    };
    let mut state = State::Code;

    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        let mut plain = chars.clone();
        let mut buf = LineOut::default();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match state {
                State::Block => {
                    let (_, end) = syntax.block.unwrap_or(("", ""));
                    if !end.is_empty() && starts_with_at(&chars, i, end) {
                        state = State::Code;
                        buf.keep(' ', i);
                        let len = end.chars().count();
                        blank(&mut plain, i, i + len);
                        i += len;
                    } else {
                        buf.comment.push(c);
                        plain[i] = ' ';
                        i += 1;
                    }
                }
                State::Str { quote, triple } => {
                    if c == '\\' {
                        i += 2;
                    } else if triple && is_triple(&chars, i, quote) {
                        buf.keep_str(&String::from(quote).repeat(3), i);
                        state = State::Code;
                        i += 3;
                    } else if !triple && c == quote {
                        buf.keep(quote, i);
                        state = State::Code;
                        i += 1;
                    } else {
                        i += 1;
                    }
                }
                State::Inline => match OPEN_TAGS.iter().find(|tag| starts_with_at(&chars, i, tag)) {
                    Some(tag) => {
                        buf.keep_str(tag, i);
                        buf.has_code = true;
                        state = State::Code;
                        i += tag.chars().count();
                    }
                    None => i += 1,
                },
                State::Code => {
                    if syntax.template_tags && starts_with_at(&chars, i, CLOSE_TAG) {
                        buf.keep_str(CLOSE_TAG, i);
                        buf.has_code = true;
                        state = State::Inline;
                        i += CLOSE_TAG.len();
                        continue;
                    }
                    if let Some(marker) = line_comment_at(&chars, i, syntax) {
                        let from = i + marker.chars().count();
                        // A close tag also ends a line comment.
                        let close = if syntax.template_tags {
                            (from..chars.len()).find(|&k| starts_with_at(&chars, k, CLOSE_TAG))
                        } else {
                            None
                        };
                        let stop = close.unwrap_or(chars.len());
                        let rest: String = chars[from..stop].iter().collect();
                        buf.comment.push_str(rest.trim());
                        blank(&mut plain, i, stop);
                        match close {
                            Some(p) => {
                                i = p;
                                continue;
                            }
                            None => break,
                        }
                    }
                    if let Some((start, _)) = syntax.block {
                        if starts_with_at(&chars, i, start) {
                            state = State::Block;
                            let len = start.chars().count();
                            blank(&mut plain, i, i + len);
                            i += len;
                            continue;
                        }
                    }
                    if syntax.triple_quotes && (c == '"' || c == '\'') && is_triple(&chars, i, c) {
                        buf.keep_str(&String::from(c).repeat(3), i);
                        state = State::Str {
                            quote: c,
                            triple: true,
                        };
                        i += 3;
                        continue;
                    }
                    if syntax.quotes.contains(&c) {
                        buf.keep(c, i);
                        state = State::Str {
                            quote: c,
                            triple: false,
                        };
                        i += 1;
                        continue;
                    }
                    if !c.is_whitespace() {
                        buf.has_code = true;
                    }
                    buf.keep(c, i);
                    i += 1;
                }
            }
        }

        // Single-line literals that never closed end with the line.
        if let State::Str {
            quote,
            triple: false,
        } = state
        {
            if !syntax.multiline_quotes.contains(&quote) {
                state = State::Code;
            }
        }

        out.code.push(buf.code);
        out.comments.push(buf.comment);
        out.code_mask.push(buf.has_code);
        out.origin.push(buf.origin);
        out.uncommented.push(plain.into_iter().collect());
    }

    out
}

fn blank(plain: &mut [char], from: usize, to: usize) {
    for c in plain.iter_mut().take(to).skip(from) {
        *c = ' ';
    }
}

fn starts_with_at(chars: &[char], i: usize, needle: &str) -> bool {
    let mut j = i;
    for n in needle.chars() {
        if chars.get(j) != Some(&n) {
            return false;
        }
        j += 1;
    }
    true
}

fn is_triple(chars: &[char], i: usize, quote: char) -> bool {
    chars.get(i) == Some(&quote) && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
}

fn line_comment_at(chars: &[char], i: usize, syntax: CommentSyntax) -> Option<&'static str> {
    for marker in syntax.line {
        if starts_with_at(chars, i, marker) {
            // PHP 8 attributes (`#[Route]`) are code, not comments.
            if *marker == "#" && syntax.block.is_some() && chars.get(i + 1) == Some(&'[') {
                continue;
            }
            return Some(marker);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(src: &str, syntax: CommentSyntax) -> Stripped {
        let lines: Vec<&str> = src.lines().collect();
        strip_lines(&lines, syntax)
    }

    #[test]
    fn test_strip_preserves_line_count() {
        let src = "a = 1  # note\n\"\"\"doc\nstring\"\"\"\nb = 'x'\n";
        let stripped = strip(src, PYTHON_SYNTAX);
        assert_eq!(stripped.code.len(), src.lines().count());
        assert_eq!(stripped.code[0].trim_end(), "a = 1");
        assert_eq!(stripped.comments[0], "note");
        assert_eq!(stripped.code[3], "b = ''");
    }

    #[test]
    fn test_strip_empties_brace_literals() {
        let src = "function f() {\n  const s = \"{ not a real brace }\";\n}\n";
        let stripped = strip(src, C_LIKE_SYNTAX);
        assert_eq!(stripped.code[1], "  const s = \"\";");
        let opens: usize = stripped.code.iter().map(|l| l.matches('{').count()).sum();
        let closes: usize = stripped.code.iter().map(|l| l.matches('}').count()).sum();
        assert_eq!(opens, closes);
    }

    #[test]
    fn test_strip_block_comments_across_lines() {
        let src = "a(); /* start\n { middle }\n end */ b();\n";
        let stripped = strip(src, C_LIKE_SYNTAX);
        assert!(!stripped.code[1].contains('{'));
        assert!(stripped.code[2].contains("b();"));
        assert!(!stripped.code_mask[1]);
    }

    #[test]
    fn test_template_literal_spans_lines() {
        let src = "const t = `line {\nstill }\n`;\nx();\n";
        let stripped = strip(src, C_LIKE_SYNTAX);
        assert_eq!(stripped.code[1], "");
        assert_eq!(stripped.code[2], "`;");
        assert_eq!(stripped.code[3], "x();");
    }

    #[test]
    fn test_docstring_lines_are_not_code() {
        let src = "def f():\n    \"\"\"Doc.\n    more\n    \"\"\"\n    return 1\n";
        let stripped = strip(src, PYTHON_SYNTAX);
        assert_eq!(stripped.code_mask, vec![true, false, false, false, true]);
        assert_eq!(stripped.code_line_count(), 2);
    }

    #[test]
    fn test_php_attributes_are_code() {
        let src = "#[Route('/x')]\n# comment\n";
        let stripped = strip(src, PHP_SYNTAX);
        assert!(stripped.code_mask[0]);
        assert!(!stripped.code_mask[1]);
        assert_eq!(stripped.comments[1], "comment");
    }

    #[test]
    fn test_escaped_quotes_stay_inside_literal() {
        let src = r#"s = "a \" { b"; t = 1"#;
        let stripped = strip(src, C_LIKE_SYNTAX);
        assert_eq!(stripped.code[0], r#"s = ""; t = 1"#);
    }

    #[test]
    fn test_php_inline_text_is_not_code() {
        let src = "<?php\nfunction a() {}\n?>\n<p>Don't panic</p>\n<?php function b() {}\n";
        let stripped = strip(src, PHP_SYNTAX);
        assert!(!stripped.code_mask[3]);
        assert_eq!(stripped.code[3], "");
        assert_eq!(stripped.code[4], "<?php function b() {}");
    }

    #[test]
    fn test_php_line_comment_ends_at_close_tag() {
        let src = "<?php echo 1; // done ?> <b>x</b>\n<?= $name ?>\n";
        let stripped = strip(src, PHP_SYNTAX);
        assert_eq!(stripped.comments[0], "done");
        assert_eq!(stripped.code[0].trim_end(), "<?php echo 1; ?>");
        assert_eq!(stripped.code[1], "<?= $name ?>");
    }

    #[test]
    fn test_original_column_skips_literal_contents() {
        let line = "@Get(':id') findOne(id: string) {";
        let stripped = strip(line, C_LIKE_SYNTAX);
        assert_eq!(stripped.code[0], "@Get('') findOne(id: string) {");
        let open = stripped.code[0].find("findOne(").map(|p| p + 7).unwrap();
        let expected = line.find("findOne(").map(|p| p + 7).unwrap();
        assert_eq!(stripped.original_column(0, open), expected);
    }

    #[test]
    fn test_uncommented_keeps_columns() {
        let line = "/* port */ const url = \"http://x\"; // tail";
        let stripped = strip(line, C_LIKE_SYNTAX);
        let plain = &stripped.uncommented[0];
        assert_eq!(plain.chars().count(), line.chars().count());
        assert_eq!(plain.trim(), "const url = \"http://x\";");
        assert_eq!(stripped.comments[0], " port tail");
    }
}
