//! Allocation-size heuristics
//!
//! Looks for literal constructions whose size is spelled out in the source
//! (`[0] * 10**9`, `bytearray(600_000_000)`, ...) and estimates whether the
//! allocation would blow through the memory ceiling. Lines are independent;
//! there is no data flow between them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use super::lexer::strip_comment;
use super::source::SourceText;

/// Memory ceiling quoted in every finding, in megabytes
pub const MEMORY_LIMIT_MB: u64 = 256;
/// Element count at which a list is considered too large
pub const MAX_LIST_ELEMENTS: u128 = 100_000_000;
/// Byte count at which a bytes/bytearray buffer is considered too large
pub const MAX_BUFFER_BYTES: u128 = 500_000_000;
/// Character count at which a string is considered too large
pub const MAX_STRING_CHARS: u128 = 1_000_000_000;

/// Size of one list slot on a 64-bit CPython build
const LIST_SLOT_BYTES: u128 = 8;

const SIZE: &str = r"(\d[\d_]*(?:\s*\*\*\s*\d[\d_]*)?)";

static LIST_REPEAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\[([^\[\]]*)\]\s*\*\s*{}", SIZE)).unwrap());
static LIST_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\blist\(\s*range\(\s*{}\s*\)\s*\)", SIZE)).unwrap()
});
static STRING_REPEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"([A-Za-z]*)(?:'([^']*)'|"([^"]*)")\s*\*\s*{}"#,
        SIZE
    ))
    .unwrap()
});
static BYTEARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(bytearray|bytes)\(\s*{}\s*\)", SIZE)).unwrap()
});
static NESTED_COMPREHENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\[\s*\[.*?\bfor\s+\w+\s+in\s+range\(\s*{}\s*\)\s*\]\s*for\s+\w+\s+in\s+range\(\s*{}\s*\)\s*\]",
        SIZE, SIZE
    ))
    .unwrap()
});
static BYTES_REPEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"\b[bB](?:'([^']*)'|"([^"]*)")\s*\*\s*{}"#,
        SIZE
    ))
    .unwrap()
});

/// Outcome of the memory scan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MemoryFinding {
    pub is_overuse: bool,
    pub message: String,
    /// Line of the offending construction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl MemoryFinding {
    fn overuse(line: usize, message: String) -> Self {
        MemoryFinding {
            is_overuse: true,
            message,
            line: Some(line),
        }
    }
}

/// Parse `123_456` or `10**9`, saturating on overflow.
fn parse_size(text: &str) -> u128 {
    let mut parts = text.split("**").map(|part| {
        part.trim()
            .replace('_', "")
            .parse::<u128>()
            .unwrap_or(u128::MAX)
    });
    let base = parts.next().unwrap_or(0);
    match parts.next() {
        Some(exp) => u32::try_from(exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .unwrap_or(u128::MAX),
        None => base,
    }
}

/// `100000000` -> `100,000,000`
pub fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn megabytes(bytes: u128) -> String {
    group_thousands(bytes / (1024 * 1024))
}

fn too_large(what: String, bytes: u128) -> String {
    format!(
        "MemoryError: {} would need about {} MB, which exceeds the {} MB memory limit",
        what,
        megabytes(bytes),
        MEMORY_LIMIT_MB
    )
}

fn literal_len(caps: &Captures<'_>, first: usize) -> u128 {
    caps.get(first)
        .or_else(|| caps.get(first + 1))
        .map(|m| m.as_str().chars().count() as u128)
        .unwrap_or(0)
}

fn check_list_repeat(line: &str) -> Option<String> {
    LIST_REPEAT.captures_iter(line).find_map(|caps| {
        let content = caps[1].trim();
        let items = content.split(',').filter(|item| !item.trim().is_empty()).count() as u128;
        let count = items.saturating_mul(parse_size(&caps[2]));
        (count >= MAX_LIST_ELEMENTS).then(|| {
            too_large(
                format!("creating a list of {} elements", group_thousands(count)),
                count.saturating_mul(LIST_SLOT_BYTES),
            )
        })
    })
}

fn check_list_range(line: &str) -> Option<String> {
    LIST_RANGE.captures_iter(line).find_map(|caps| {
        let count = parse_size(&caps[1]);
        (count >= MAX_LIST_ELEMENTS).then(|| {
            too_large(
                format!("list(range(...)) with {} elements", group_thousands(count)),
                count.saturating_mul(LIST_SLOT_BYTES),
            )
        })
    })
}

fn check_string_repeat(line: &str) -> Option<String> {
    STRING_REPEAT.captures_iter(line).find_map(|caps| {
        if caps[1].contains(['b', 'B']) {
            return None;
        }
        let chars = literal_len(&caps, 2).saturating_mul(parse_size(&caps[4]));
        (chars >= MAX_STRING_CHARS).then(|| {
            too_large(
                format!("creating a string of {} characters", group_thousands(chars)),
                chars,
            )
        })
    })
}

fn check_bytearray(line: &str) -> Option<String> {
    BYTEARRAY.captures_iter(line).find_map(|caps| {
        let bytes = parse_size(&caps[2]);
        (bytes >= MAX_BUFFER_BYTES).then(|| {
            too_large(
                format!("allocating a {} of {} bytes", &caps[1], group_thousands(bytes)),
                bytes,
            )
        })
    })
}

fn check_nested_comprehension(line: &str) -> Option<String> {
    NESTED_COMPREHENSION.captures_iter(line).find_map(|caps| {
        let inner = parse_size(&caps[1]);
        let outer = parse_size(&caps[2]);
        let count = inner.saturating_mul(outer);
        (count >= MAX_LIST_ELEMENTS).then(|| {
            too_large(
                format!(
                    "a nested list comprehension of {} x {} = {} elements",
                    group_thousands(outer),
                    group_thousands(inner),
                    group_thousands(count)
                ),
                count.saturating_mul(LIST_SLOT_BYTES),
            )
        })
    })
}

fn check_bytes_repeat(line: &str) -> Option<String> {
    BYTES_REPEAT.captures_iter(line).find_map(|caps| {
        let bytes = literal_len(&caps, 1).saturating_mul(parse_size(&caps[3]));
        (bytes >= MAX_BUFFER_BYTES).then(|| {
            too_large(
                format!("creating a bytes object of {} bytes", group_thousands(bytes)),
                bytes,
            )
        })
    })
}

/// Pattern checks in the order they are tried on each line
const CHECKS: [(&str, fn(&str) -> Option<String>); 6] = [
    ("list_repeat", check_list_repeat),
    ("list_range", check_list_range),
    ("string_repeat", check_string_repeat),
    ("bytearray", check_bytearray),
    ("nested_comprehension", check_nested_comprehension),
    ("bytes_repeat", check_bytes_repeat),
];

/// Scan top to bottom; the first oversized construction wins.
pub fn scan(source: &SourceText<'_>) -> MemoryFinding {
    for (number, raw) in source.numbered() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        for (name, check) in CHECKS.iter() {
            if let Some(message) = check(line) {
                debug!(pattern = *name, line = number, "memory heuristic fired");
                return MemoryFinding::overuse(number, message);
            }
        }
    }
    MemoryFinding::default()
}
