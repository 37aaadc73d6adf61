//! Whole-file bracket balance
//!
//! Walks the code portion of every line with a stack of open delimiters.
//! The first closer that does not fit is reported immediately; otherwise the
//! innermost opener still on the stack at end of file is reported.

use serde::Serialize;

use super::diagnostic::Diagnostic;
use super::lexer::scan_source;
use super::source::SourceText;

/// What went wrong with a delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    UnexpectedCloser,
    MismatchedCloser,
    UnclosedOpener,
}

/// A single bracket imbalance, positioned at the offending character
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketFault {
    pub kind: FaultKind,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    pub message: String,
}

impl BracketFault {
    /// Convert into a `SyntaxError` diagnostic
    pub fn to_diagnostic(&self, source: &SourceText<'_>) -> Diagnostic {
        let suggestion = match self.kind {
            FaultKind::UnexpectedCloser => {
                "Remove the extra closing bracket or add the matching opening bracket before it"
            }
            FaultKind::MismatchedCloser => {
                "Make sure every opening bracket is closed by the same kind of bracket"
            }
            FaultKind::UnclosedOpener => "Add the missing closing bracket",
        };
        Diagnostic::syntax(source, self.line, self.message.clone(), suggestion)
            .with_column(self.column)
    }
}

#[derive(Debug, Clone, Copy)]
struct Open {
    ch: char,
    line: usize,
    column: usize,
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn bracket_name(ch: char) -> &'static str {
    match ch {
        '(' | ')' => "parenthesis",
        '[' | ']' => "bracket",
        _ => "brace",
    }
}

/// Scan the whole source; `None` means every delimiter is balanced.
pub fn scan(source: &SourceText<'_>) -> Option<BracketFault> {
    let mut stack: Vec<Open> = Vec::new();

    for (idx, scan) in scan_source(source).iter().enumerate() {
        let line = idx + 1;
        for (col, ch) in scan.code.chars().enumerate() {
            let column = col + 1;
            match ch {
                '(' | '[' | '{' => stack.push(Open { ch, line, column }),
                ')' | ']' | '}' => match stack.pop() {
                    None => {
                        return Some(BracketFault {
                            kind: FaultKind::UnexpectedCloser,
                            line,
                            column,
                            message: format!("unmatched '{}'", ch),
                        });
                    }
                    Some(open) if closer_for(open.ch) != ch => {
                        let mut message = format!(
                            "closing {} '{}' does not match opening {} '{}'",
                            bracket_name(ch),
                            ch,
                            bracket_name(open.ch),
                            open.ch
                        );
                        if open.line != line {
                            message.push_str(&format!(" on line {}", open.line));
                        }
                        return Some(BracketFault {
                            kind: FaultKind::MismatchedCloser,
                            line,
                            column,
                            message,
                        });
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
    }

    stack.pop().map(|open| BracketFault {
        kind: FaultKind::UnclosedOpener,
        line: open.line,
        column: open.column,
        message: format!("'{}' was never closed", open.ch),
    })
}
