//! Line-oriented syntax rules
//!
//! Each non-blank, non-comment line is offered to [`RULES`] in order. A rule
//! is a predicate plus a builder: the predicate decides whether the rule
//! applies, the builder may still decline (for example when an unclosed
//! bracket is closed on a following line). The first diagnostic produced
//! ends the scan. Several rules can match the same line, so the order of
//! [`RULES`] decides which message the student sees.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::diagnostic::{Diagnostic, ErrorKind};
use super::lexer::{scan_source, strip_comment, LineScan};
use super::source::SourceText;

static BLOCK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(if|elif|else|while|for|def|class)\b").unwrap());
static SIMPLE_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+\s*=([^=]|$)").unwrap());
static CONDITION_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(if|elif|while)\b").unwrap());
static PY2_PRINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^print\s+[^\s(=]").unwrap());
static CONTAINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]*)\]|\{([^{}]*)\}").unwrap());
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());
static DEF_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+(\w+)").unwrap());
static DEF_WITH_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^def\s+\w+\s*\(").unwrap());
static TOP_LEVEL_RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^return\b").unwrap());
static DEF_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*def\s").unwrap());
static LOOP_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(for|while)\b").unwrap());
static DIGIT_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+[A-Za-z_]\w*)\s*=([^=]|$)").unwrap());
static KEYWORD_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(False|None|True|and|as|assert|async|await|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|try|while|with|yield)\s*=([^=]|$)",
    )
    .unwrap()
});

/// Keywords that may legitimately sit between two bare tokens in a
/// bracketed expression (comprehensions, conditionals, boolean logic).
const EXPRESSION_KEYWORDS: &[&str] = &[
    "for", "in", "if", "else", "not", "and", "or", "is", "lambda", "async", "await",
];

/// Everything a rule may look at for the line under test
struct LineContext<'s, 'a> {
    source: &'s SourceText<'a>,
    scans: &'s [LineScan],
    number: usize,
    raw: &'a str,
    scan: &'s LineScan,
    /// Bracket depth carried in from previous lines
    depth_before: i64,
}

impl LineContext<'_, '_> {
    /// Trimmed code portion (strings blanked, comment dropped)
    fn code(&self) -> &str {
        self.scan.code.trim()
    }

    /// Trimmed original text without the trailing comment
    fn text(&self) -> &str {
        strip_comment(self.raw).trim()
    }

    fn earlier_lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.source.lines()[..self.number - 1].iter().copied()
    }

    /// True when the openers left unclosed on this line are closed by the
    /// following lines, i.e. the line is an implicit continuation.
    fn closes_later(&self, open: char, close: char) -> bool {
        let mut depth = self.scan.net_depth(open, close);
        if depth <= 0 {
            return true;
        }
        for scan in &self.scans[self.number..] {
            depth += scan.net_depth(open, close);
            if depth <= 0 {
                return true;
            }
        }
        false
    }

    fn diagnostic(&self, message: impl Into<String>, suggestion: impl Into<String>) -> Diagnostic {
        Diagnostic::syntax(self.source, self.number, message, suggestion)
    }
}

/// A predicate and the builder run when it matches
struct Rule {
    name: &'static str,
    matches: fn(&LineContext<'_, '_>) -> bool,
    build: fn(&LineContext<'_, '_>) -> Option<Diagnostic>,
}

static RULES: [Rule; 15] = [
    Rule {
        name: "missing_colon",
        matches: missing_colon_matches,
        build: missing_colon,
    },
    Rule {
        name: "unclosed_paren",
        matches: |ctx| ctx.scan.net_depth('(', ')') > 0,
        build: |ctx| unclosed_bracket(ctx, '(', ')', "parenthesis", "parentheses"),
    },
    Rule {
        name: "unclosed_single_quote",
        matches: |ctx| has_odd_quotes(ctx.text(), '\''),
        build: |ctx| unterminated_string(ctx, '\''),
    },
    Rule {
        name: "unclosed_double_quote",
        matches: |ctx| has_odd_quotes(ctx.text(), '"'),
        build: |ctx| unterminated_string(ctx, '"'),
    },
    Rule {
        name: "unclosed_bracket",
        matches: |ctx| ctx.scan.net_depth('[', ']') > 0,
        build: |ctx| unclosed_bracket(ctx, '[', ']', "bracket", "brackets"),
    },
    Rule {
        name: "unclosed_brace",
        matches: |ctx| ctx.scan.net_depth('{', '}') > 0,
        build: |ctx| unclosed_bracket(ctx, '{', '}', "brace", "braces"),
    },
    Rule {
        name: "assignment_in_condition",
        matches: |ctx| CONDITION_HEADER.is_match(ctx.code()),
        build: assignment_in_condition,
    },
    Rule {
        name: "python2_print",
        matches: |ctx| PY2_PRINT.is_match(ctx.code()),
        build: python2_print,
    },
    Rule {
        name: "missing_comma",
        matches: |ctx| CONTAINER.is_match(ctx.text()),
        build: missing_comma,
    },
    Rule {
        name: "def_without_parens",
        matches: |ctx| DEF_NAME.is_match(ctx.code()) && !DEF_WITH_PARENS.is_match(ctx.code()),
        build: def_without_parens,
    },
    Rule {
        name: "mixed_indentation",
        matches: |ctx| {
            let indent: String = ctx.raw.chars().take_while(|c| c.is_whitespace()).collect();
            indent.contains(' ') && indent.contains('\t')
        },
        build: |ctx| {
            Some(Diagnostic::new(
                ErrorKind::IndentationError,
                ctx.source,
                ctx.number,
                "inconsistent use of tabs and spaces in indentation",
                "Indent with spaces only (4 per level) and do not mix in tab characters",
            ))
        },
    },
    Rule {
        name: "return_outside_function",
        matches: |ctx| TOP_LEVEL_RETURN.is_match(ctx.raw),
        build: |ctx| {
            if ctx.earlier_lines().any(|line| DEF_LINE.is_match(line)) {
                return None;
            }
            Some(ctx.diagnostic(
                "'return' outside function",
                "'return' can only be used inside a function defined with 'def'",
            ))
        },
    },
    Rule {
        name: "jump_outside_loop",
        matches: |ctx| matches!(ctx.code(), "break" | "continue"),
        build: |ctx| {
            if ctx.earlier_lines().any(|line| LOOP_LINE.is_match(line)) {
                return None;
            }
            let (message, keyword) = if ctx.code() == "break" {
                ("'break' outside loop", "break")
            } else {
                ("'continue' not properly in loop", "continue")
            };
            Some(ctx.diagnostic(
                message,
                format!("'{}' can only be used inside a 'for' or 'while' loop", keyword),
            ))
        },
    },
    Rule {
        name: "digit_identifier",
        matches: |ctx| DIGIT_IDENTIFIER.is_match(ctx.code()),
        build: |ctx| {
            let caps = DIGIT_IDENTIFIER.captures(ctx.code())?;
            let name = &caps[1];
            Some(ctx.diagnostic(
                "invalid decimal literal",
                format!(
                    "Variable names cannot start with a digit. Rename '{}' to something like '_{}'",
                    name, name
                ),
            ))
        },
    },
    Rule {
        name: "keyword_assignment",
        matches: |ctx| KEYWORD_ASSIGNMENT.is_match(ctx.code()),
        build: |ctx| {
            let caps = KEYWORD_ASSIGNMENT.captures(ctx.code())?;
            let keyword = &caps[1];
            let message = if matches!(keyword, "True" | "False" | "None") {
                format!("cannot assign to {}", keyword)
            } else {
                format!(
                    "invalid syntax: '{}' is a reserved keyword and cannot be used as a variable name",
                    keyword
                )
            };
            Some(ctx.diagnostic(
                message,
                format!(
                    "Choose a different variable name, for example '{}_value'",
                    keyword.to_lowercase()
                ),
            ))
        },
    },
];

/// Odd number of unescaped `quote` characters, not counting triple-quote
/// delimiters. Quotes of the other kind do not shield it, so `"it's"` counts.
fn has_odd_quotes(text: &str, quote: char) -> bool {
    let triple: String = [quote; 3].iter().collect();
    let text = text.replace(&triple, "");
    let mut count = 0usize;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            count += 1;
        }
    }
    count % 2 == 1
}

fn missing_colon_matches(ctx: &LineContext<'_, '_>) -> bool {
    let code = ctx.code();
    BLOCK_HEADER.is_match(code) && !SIMPLE_ASSIGNMENT.is_match(code) && !code.contains(':')
}

fn missing_colon(ctx: &LineContext<'_, '_>) -> Option<Diagnostic> {
    if ctx.depth_before > 0 || ctx.code().ends_with('\\') {
        return None;
    }
    let continued = [('(', ')'), ('[', ']'), ('{', '}')]
        .iter()
        .any(|&(open, close)| ctx.scan.net_depth(open, close) > 0 && ctx.closes_later(open, close));
    if continued {
        return None;
    }

    let keyword = BLOCK_HEADER.captures(ctx.code())?.get(1)?.as_str();
    Some(ctx.diagnostic(
        format!("expected ':' at the end of the '{}' statement", keyword),
        format!("Add a colon at the end of the line: {}:", ctx.text()),
    ))
}

fn unclosed_bracket(
    ctx: &LineContext<'_, '_>,
    open: char,
    close: char,
    singular: &str,
    plural: &str,
) -> Option<Diagnostic> {
    if ctx.closes_later(open, close) {
        return None;
    }
    let missing = ctx.scan.net_depth(open, close);
    let noun = if missing == 1 { singular } else { plural };
    Some(ctx.diagnostic(
        format!("'{}' was never closed", open),
        format!("Add {} closing {} '{}'", missing, noun, close),
    ))
}

fn unterminated_string(ctx: &LineContext<'_, '_>, quote: char) -> Option<Diagnostic> {
    Some(ctx.diagnostic(
        format!("unterminated string literal (detected at line {})", ctx.number),
        format!("Add a closing {} to end the string on the same line", quote),
    ))
}

fn assignment_in_condition(ctx: &LineContext<'_, '_>) -> Option<Diagnostic> {
    let keyword_end = CONDITION_HEADER.find(ctx.code())?.end();
    let offset = ctx.scan.code.len() - ctx.scan.code.trim_start().len();
    let code: Vec<char> = ctx.scan.code.chars().collect();
    let start = ctx.scan.code[..offset + keyword_end].chars().count();
    let position = find_bare_assign(&code, start)?;

    let fixed: String = ctx
        .raw
        .chars()
        .enumerate()
        .flat_map(|(idx, c)| {
            if idx == position {
                vec!['=', '=']
            } else {
                vec![c]
            }
        })
        .collect();

    Some(ctx.diagnostic(
        "invalid syntax. Maybe you meant '==' or ':=' instead of '='?",
        format!(
            "Use '==' to compare values: {}",
            strip_comment(&fixed).trim()
        ),
    ))
}

/// Position of the first `=` that is neither part of a comparison, an
/// augmented operator nor a keyword argument inside parentheses.
fn find_bare_assign(code: &[char], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut i = start;
    while i < code.len() {
        match code[i] {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            '=' if code.get(i + 1) == Some(&'=') => {
                i += 2;
                continue;
            }
            '=' if depth <= 0 => {
                let prev = if i > 0 { code[i - 1] } else { ' ' };
                if !matches!(
                    prev,
                    '!' | '<' | '>' | ':' | '=' | '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^'
                ) {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn python2_print(ctx: &LineContext<'_, '_>) -> Option<Diagnostic> {
    let args = ctx.text().strip_prefix("print")?.trim();
    Some(ctx.diagnostic(
        "Missing parentheses in call to 'print'. Did you mean print(...)?",
        format!("In Python 3 print is a function: print({})", args),
    ))
}

fn missing_comma(ctx: &LineContext<'_, '_>) -> Option<Diagnostic> {
    for caps in CONTAINER.captures_iter(ctx.text()) {
        let content = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let tokens: Vec<&str> = TOKEN.find_iter(content).map(|m| m.as_str()).collect();
        for pair in tokens.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            if is_operand_end(left) && is_operand_start(right) {
                return Some(ctx.diagnostic(
                    "invalid syntax. Perhaps you forgot a comma?",
                    format!("Separate the elements with a comma: {}, {}", left, right),
                ));
            }
        }
    }
    None
}

fn is_operand_end(token: &str) -> bool {
    !EXPRESSION_KEYWORDS.contains(&token)
        && token
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '\'' | '"' | ')' | ']'))
}

fn is_operand_start(token: &str) -> bool {
    !EXPRESSION_KEYWORDS.contains(&token)
        && token
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '\'' | '"' | '(' | '['))
}

fn def_without_parens(ctx: &LineContext<'_, '_>) -> Option<Diagnostic> {
    let caps = DEF_NAME.captures(ctx.code())?;
    Some(ctx.diagnostic(
        "invalid syntax: function definition is missing parentheses",
        format!(
            "Put the parameter list in parentheses, even when empty: def {}():",
            &caps[1]
        ),
    ))
}

/// Run the rule catalog over every line; the first diagnostic wins.
pub fn check(source: &SourceText<'_>) -> Option<Diagnostic> {
    let scans = scan_source(source);
    let mut depth = 0i64;

    for (idx, raw) in source.lines().iter().enumerate() {
        let scan = &scans[idx];
        let depth_before = depth;
        depth = (depth
            + scan.net_depth('(', ')')
            + scan.net_depth('[', ']')
            + scan.net_depth('{', '}'))
        .max(0);

        let trimmed = raw.trim();
        if scan.continues_string || trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let ctx = LineContext {
            source,
            scans: &scans,
            number: idx + 1,
            raw,
            scan,
            depth_before,
        };

        for rule in RULES.iter() {
            if !(rule.matches)(&ctx) {
                continue;
            }
            if let Some(diagnostic) = (rule.build)(&ctx) {
                debug!(rule = rule.name, line = ctx.number, "syntax rule fired");
                return Some(diagnostic);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(code: &str) -> Option<Diagnostic> {
        check(&SourceText::new(code))
    }

    #[test]
    fn test_valid_program_passes() {
        let code = "def greet(name):\n    return f\"Hi {name}\"\n\nfor i in range(3):\n    if i == 1:\n        continue\n    print(greet(i))\n";
        assert!(diag(code).is_none());
    }

    #[test]
    fn test_missing_colon() {
        let d = diag("x = 10\nif x > 5\n    print(x)").unwrap();
        assert_eq!(d.kind, ErrorKind::SyntaxError);
        assert_eq!(d.line, 2);
        assert!(d.message.contains("'if'"));
        assert!(d.suggestion.ends_with("if x > 5:"));
    }

    #[test]
    fn test_missing_colon_on_else_and_def() {
        assert!(diag("if a:\n    pass\nelse\n    pass").unwrap().message.contains("'else'"));
        assert!(diag("def f()\n    pass").unwrap().message.contains("'def'"));
    }

    #[test]
    fn test_multi_line_header_is_not_missing_colon() {
        assert!(diag("if (a and\n        b):\n    pass").is_none());
    }

    #[test]
    fn test_unclosed_paren_counts_missing() {
        let d = diag("print(1, 2").unwrap();
        assert_eq!(d.message, "'(' was never closed");
        assert_eq!(d.suggestion, "Add 1 closing parenthesis ')'");

        let d = diag("print(len([1, 2])").unwrap();
        assert_eq!(d.suggestion, "Add 1 closing parenthesis ')'");

        let d = diag("x = ((1 + 2").unwrap();
        assert_eq!(d.suggestion, "Add 2 closing parentheses ')'");
    }

    #[test]
    fn test_multi_line_call_is_accepted() {
        assert!(diag("total = sum([\n    1,\n    2,\n])\nprint(total)").is_none());
    }

    #[test]
    fn test_unterminated_strings() {
        let d = diag("greeting = 'hello").unwrap();
        assert!(d.message.starts_with("unterminated string literal"));
        assert!(d.suggestion.contains('\''));

        let d = diag("name = \"Ada").unwrap();
        assert!(d.suggestion.contains('"'));
    }

    #[test]
    fn test_quote_count_ignores_enclosing_string() {
        let d = diag("print(\"it's\")").unwrap();
        assert_eq!(d.message, "unterminated string literal (detected at line 1)");
        assert!(d.suggestion.contains('\''));

        assert!(diag(r"s = 'it\'s'").is_none());
        assert!(diag("doc = \"\"\"Title\nbody\n\"\"\"").is_none());
        assert!(diag("x = 1  # don't").is_none());
    }

    #[test]
    fn test_paren_rule_precedes_string_rule() {
        // The ')' sits inside the unterminated string, so both rules match.
        let d = diag("print('hello)").unwrap();
        assert_eq!(d.message, "'(' was never closed");

        let d = diag("x = 1\ns = \"hi").unwrap();
        assert_eq!(d.message, "unterminated string literal (detected at line 2)");
    }

    #[test]
    fn test_unclosed_bracket_and_brace() {
        assert_eq!(diag("xs = [1, 2").unwrap().message, "'[' was never closed");
        assert_eq!(diag("d = {'a': 1").unwrap().message, "'{' was never closed");
    }

    #[test]
    fn test_assignment_in_condition() {
        let d = diag("x = 1\nif x = 1:\n    pass").unwrap();
        assert_eq!(d.line, 2);
        assert!(d.message.contains("'=='"));
        assert!(d.suggestion.ends_with("if x == 1:"));

        assert!(diag("while (n := n - 1) >= 0:\n    pass").is_none());
        assert!(diag("if x != 1 and y <= 2:\n    pass").is_none());
    }

    #[test]
    fn test_python2_print() {
        let d = diag("print \"hello\"").unwrap();
        assert!(d.message.starts_with("Missing parentheses in call to 'print'"));
        assert!(d.suggestion.ends_with("print(\"hello\")"));
    }

    #[test]
    fn test_missing_comma() {
        let d = diag("nums = [1 2 3]").unwrap();
        assert!(d.message.contains("forgot a comma"));
        assert!(d.suggestion.ends_with("1, 2"));

        assert!(diag("squares = [x * x for x in range(5)]").is_none());
        assert!(diag("d = {'a': 1, 'b': 2}").is_none());
    }

    #[test]
    fn test_missing_comma_flags_multi_word_strings() {
        assert!(diag("words = [\"hello world\"]").is_some());
    }

    #[test]
    fn test_def_without_parens() {
        let d = diag("def greet:\n    pass").unwrap();
        assert!(d.message.contains("missing parentheses"));
        assert!(d.suggestion.ends_with("def greet():"));
    }

    #[test]
    fn test_mixed_indentation() {
        let d = diag("if True:\n \tprint(1)").unwrap();
        assert_eq!(d.kind, ErrorKind::IndentationError);
        assert_eq!(d.line, 2);
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(diag("x = 1\nreturn x").unwrap().message, "'return' outside function");
        assert!(diag("def f():\n    pass\nreturn 1").is_none());
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(diag("break").unwrap().message, "'break' outside loop");
        assert_eq!(
            diag("x = 1\ncontinue").unwrap().message,
            "'continue' not properly in loop"
        );
        assert!(diag("for i in range(2):\n    break").is_none());
    }

    #[test]
    fn test_digit_identifier() {
        let d = diag("1st = 'gold'").unwrap();
        assert_eq!(d.message, "invalid decimal literal");
        assert!(d.suggestion.contains("'1st'"));
    }

    #[test]
    fn test_keyword_assignment() {
        assert_eq!(diag("None = 1").unwrap().message, "cannot assign to None");
        assert!(diag("lambda = 3").unwrap().message.contains("'lambda'"));
        assert!(diag("class = 'A'").unwrap().message.contains("'class'"));
    }

    #[test]
    fn test_first_line_wins() {
        let d = diag("print 'a'\nif x\n").unwrap();
        assert_eq!(d.line, 1);
    }

    #[test]
    fn test_comments_and_docstrings_are_skipped() {
        assert!(diag("# if x\n\"\"\"\nDon't (\n\"\"\"\nx = 1").is_none());
    }

    #[test]
    fn test_check_is_deterministic() {
        let source = SourceText::new("if x = 1\n    print(x");
        assert_eq!(check(&source), check(&source));
    }
}
