//! Per-line quote and comment state machine
//!
//! Every scanner needs to know which characters of a line are code and which
//! sit inside a string literal or a trailing comment. [`scan_line`] blanks
//! string contents and drops comments while keeping character columns
//! aligned with the original line, so bracket positions can be reported
//! against the text the student wrote.

use super::source::SourceText;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str(char),
    Triple(char),
}

/// The code-only view of one physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineScan {
    /// Line text with string contents replaced by spaces and any comment
    /// removed. Quote characters are kept. Character `i` of `code` is
    /// character `i` of the original line.
    pub code: String,
    /// Quote character of a triple-quoted string still open at end of line.
    pub open_triple: Option<char>,
    /// The line began inside a triple-quoted string from an earlier line.
    pub continues_string: bool,
}

impl LineScan {
    /// Count of `open` minus count of `close` in the code portion.
    pub fn net_depth(&self, open: char, close: char) -> i64 {
        self.code.chars().fold(0, |depth, c| {
            if c == open {
                depth + 1
            } else if c == close {
                depth - 1
            } else {
                depth
            }
        })
    }
}

/// Scan a single line, starting inside a triple-quoted string if `triple`
/// carries one over from the previous line.
pub fn scan_line(line: &str, triple: Option<char>) -> LineScan {
    let chars: Vec<char> = line.chars().collect();
    let mut state = triple.map(State::Triple).unwrap_or(State::Code);
    let mut code = String::with_capacity(line.len());
    let mut i = 0;

    let is_triple_at = |i: usize, q: char| {
        chars.get(i) == Some(&q) && chars.get(i + 1) == Some(&q) && chars.get(i + 2) == Some(&q)
    };

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Code => {
                if c == '#' {
                    break;
                }
                if c == '\'' || c == '"' {
                    if is_triple_at(i, c) {
                        state = State::Triple(c);
                        code.extend([c, c, c]);
                        i += 3;
                        continue;
                    }
                    state = State::Str(c);
                }
                code.push(c);
            }
            State::Str(q) | State::Triple(q) => {
                if c == '\\' {
                    code.push(' ');
                    if i + 1 < chars.len() {
                        code.push(' ');
                    }
                    i += 2;
                    continue;
                }
                if matches!(state, State::Triple(_)) {
                    if is_triple_at(i, q) {
                        state = State::Code;
                        code.extend([q, q, q]);
                        i += 3;
                        continue;
                    }
                    code.push(' ');
                } else if c == q {
                    state = State::Code;
                    code.push(c);
                } else {
                    code.push(' ');
                }
            }
        }
        i += 1;
    }

    LineScan {
        code,
        open_triple: match state {
            State::Triple(q) => Some(q),
            _ => None,
        },
        continues_string: triple.is_some(),
    }
}

/// Scan every line of a source, threading triple-quoted string state.
pub fn scan_source(source: &SourceText<'_>) -> Vec<LineScan> {
    let mut triple = None;
    source
        .lines()
        .iter()
        .map(|line| {
            let scan = scan_line(line, triple);
            triple = scan.open_triple;
            scan
        })
        .collect()
}

/// Strip a trailing `#` comment from a line, respecting string literals.
pub fn strip_comment(line: &str) -> &str {
    let scan = scan_line(line, None);
    let end = line
        .char_indices()
        .nth(scan.code.chars().count())
        .map(|(idx, _)| idx)
        .unwrap_or(line.len());
    &line[..end]
}
