//! Structured syntax diagnostics

use serde::{Deserialize, Serialize};

use super::source::SourceText;

/// Python exception class reported for a static syntax problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    SyntaxError,
    IndentationError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SyntaxError => write!(f, "SyntaxError"),
            ErrorKind::IndentationError => write!(f, "IndentationError"),
        }
    }
}

/// One line of the context shown around an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetLine {
    pub line_number: usize,
    pub text: String,
    pub is_error_line: bool,
}

/// A syntax problem tied to a line of the submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// 1-based line number
    pub line: usize,
    /// 1-based column, when the problem has a precise position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    pub suggestion: String,
    /// The offending line with one line of context on either side
    pub code_snippet: Vec<SnippetLine>,
}

impl Diagnostic {
    /// Build a diagnostic, capturing the snippet around `line` from `source`.
    pub fn new(
        kind: ErrorKind,
        source: &SourceText<'_>,
        line: usize,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            line,
            column: None,
            message: message.into(),
            suggestion: suggestion.into(),
            code_snippet: snippet(source, line),
        }
    }

    /// Shorthand for a `SyntaxError`
    pub fn syntax(
        source: &SourceText<'_>,
        line: usize,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Diagnostic::new(ErrorKind::SyntaxError, source, line, message, suggestion)
    }

    /// Attach a column
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Render as a short traceback-style block
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.code_snippet {
            let marker = if line.is_error_line { ">" } else { " " };
            out.push_str(&format!("{} {:>4} | {}\n", marker, line.line_number, line.text));
        }
        out.push_str(&format!("{}: {} (line {})\n", self.kind, self.message, self.line));
        if !self.suggestion.is_empty() {
            out.push_str(&format!("Suggestion: {}", self.suggestion));
        }
        out
    }
}

/// Lines `line - 1 ..= line + 1`, clamped to the file.
fn snippet(source: &SourceText<'_>, line: usize) -> Vec<SnippetLine> {
    let first = line.saturating_sub(1).max(1);
    let last = (line + 1).min(source.len());
    (first..=last)
        .filter_map(|number| {
            source.line(number).map(|text| SnippetLine {
                line_number: number,
                text: text.to_string(),
                is_error_line: number == line,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_is_centered_on_error_line() {
        let source = SourceText::new("a\nb\nc\nd");
        let diag = Diagnostic::syntax(&source, 2, "bad", "fix");
        let numbers: Vec<usize> = diag.code_snippet.iter().map(|l| l.line_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(diag.code_snippet[1].is_error_line);
        assert!(!diag.code_snippet[0].is_error_line);
    }

    #[test]
    fn test_snippet_clamps_to_file_bounds() {
        let source = SourceText::new("a\nb");
        let first = Diagnostic::syntax(&source, 1, "bad", "fix");
        assert_eq!(first.code_snippet.len(), 2);
        let last = Diagnostic::syntax(&source, 2, "bad", "fix");
        assert_eq!(last.code_snippet[0].line_number, 1);
        assert_eq!(last.code_snippet.len(), 2);

        let single = SourceText::new("only");
        assert_eq!(Diagnostic::syntax(&single, 1, "bad", "fix").code_snippet.len(), 1);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let source = SourceText::new("x");
        let diag = Diagnostic::syntax(&source, 1, "bad", "fix");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["type"], "SyntaxError");
        assert!(json.get("column").is_none());
    }
}
