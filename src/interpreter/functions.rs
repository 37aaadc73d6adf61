//! Function definitions pulled out of the submission before it runs

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::{indentation, SourceText};

static DEF_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^def\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?:->[^:]*)?:").unwrap());

/// A declared parameter, with its default expression if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub default: Option<String>,
}

/// A user function: its parameters and the raw lines of its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<String>,
}

fn parse_param(text: &str) -> Option<Param> {
    let (head, default) = match text.split_once('=') {
        Some((head, default)) => (head, Some(default.trim().to_string())),
        None => (text, None),
    };
    let name = head.split(':').next().unwrap_or(head).trim();
    (!name.is_empty()).then(|| Param {
        name: name.to_string(),
        default,
    })
}

/// Whether `line` opens a function definition
pub fn is_def_header(line: &str) -> bool {
    DEF_HEADER.is_match(line.trim())
}

/// Collect every `def name(params):` in the source. A body runs until the
/// first non-blank line indented at or left of its header; later
/// definitions with the same name replace earlier ones.
pub fn extract(source: &SourceText<'_>) -> HashMap<String, Function> {
    let lines = source.lines();
    let mut functions = HashMap::new();

    for (idx, raw) in lines.iter().enumerate() {
        let Some(caps) = DEF_HEADER.captures(raw.trim()) else {
            continue;
        };
        let header_indent = indentation(raw);
        let body = lines[idx + 1..]
            .iter()
            .take_while(|line| line.trim().is_empty() || indentation(line) > header_indent)
            .map(|line| line.to_string())
            .collect();
        let params = caps[2].split(',').filter_map(parse_param).collect();

        functions.insert(
            caps[1].to_string(),
            Function {
                name: caps[1].to_string(),
                params,
                body,
            },
        );
    }

    functions
}
