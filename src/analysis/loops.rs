//! Always-true loop detection
//!
//! A `while True:` style header is considered infinite unless a `break`
//! shows up somewhere in its indented body. The body ends at the first
//! non-blank line indented at or left of the header.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::lexer::{scan_line, strip_comment};
use super::source::{indentation, SourceText};

static ALWAYS_TRUE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:while\s*(?:True|1|\(\s*True\s*\)|\(\s*1\s*\))|for\s+\w+\s+in\s+(?:itertools\.)?cycle\(.*\))\s*:(.*)$")
        .unwrap()
});
static BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bbreak\b").unwrap());

/// Outcome of the loop scan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LoopFinding {
    pub is_infinite: bool,
    pub message: String,
    /// Line of the loop header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

fn has_break(text: &str) -> bool {
    BREAK.is_match(&scan_line(text, None).code)
}

/// Whether the body below the header at `header_idx` contains a `break`.
fn body_breaks(lines: &[&str], header_idx: usize, header_indent: usize) -> bool {
    for line in &lines[header_idx + 1..] {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if indentation(line) <= header_indent {
            return false;
        }
        if has_break(line) {
            return true;
        }
    }
    false
}

/// Scan top to bottom; the first loop with no way out wins.
pub fn scan(source: &SourceText<'_>) -> LoopFinding {
    let lines = source.lines();

    for (idx, raw) in lines.iter().enumerate() {
        let header = strip_comment(raw).trim();
        let Some(caps) = ALWAYS_TRUE_HEADER.captures(header) else {
            continue;
        };

        let inline_body = caps[1].trim();
        let exits = if inline_body.is_empty() {
            body_breaks(lines, idx, indentation(raw))
        } else {
            has_break(inline_body)
        };
        if exits {
            continue;
        }

        let number = idx + 1;
        debug!(line = number, "infinite loop heuristic fired");
        return LoopFinding {
            is_infinite: true,
            message: format!(
                "TimeoutError: infinite loop detected on line {}: '{}' never ends because its body has no 'break' statement",
                number, header
            ),
            line: Some(number),
        };
    }

    LoopFinding::default()
}
