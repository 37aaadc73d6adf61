//! Static analysis - heuristic classification of a submission before it runs
//!
//! Stages, in priority order:
//! - Syntax: the line rule catalog, then whole-file bracket balance
//! - Memory: oversized literal allocations
//! - Loops: always-true loops without a `break`
//!
//! Every stage is a pure function of the source text. None of them parse
//! Python for real; they are best-effort filters and may misclassify.

pub mod brackets;
pub mod diagnostic;
pub mod lexer;
pub mod loops;
pub mod memory;
mod source;
pub mod syntax;

pub use brackets::{BracketFault, FaultKind};
pub use diagnostic::{Diagnostic, ErrorKind, SnippetLine};
pub use loops::LoopFinding;
pub use memory::{MemoryFinding, MEMORY_LIMIT_MB};
pub use source::{indentation, SourceText};

use serde::Serialize;

/// The first problem found by the static stages, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Syntax(Diagnostic),
    Memory(MemoryFinding),
    InfiniteLoop(LoopFinding),
    Clear,
}

/// Every stage's result side by side, for reporting without executing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub syntax_error: Option<Diagnostic>,
    pub memory: MemoryFinding,
    pub infinite_loop: LoopFinding,
}

/// Rule catalog first, bracket balance only if no rule fired.
pub fn check_syntax(source: &SourceText<'_>) -> Option<Diagnostic> {
    syntax::check(source).or_else(|| brackets::scan(source).map(|fault| fault.to_diagnostic(source)))
}

/// Run the stages in priority order, stopping at the first problem. A blank
/// submission has nothing to check.
pub fn classify(source: &SourceText<'_>) -> Verdict {
    if source.is_empty() {
        return Verdict::Clear;
    }

    if let Some(diagnostic) = check_syntax(source) {
        return Verdict::Syntax(diagnostic);
    }

    let memory = memory::scan(source);
    if memory.is_overuse {
        return Verdict::Memory(memory);
    }

    let infinite_loop = loops::scan(source);
    if infinite_loop.is_infinite {
        return Verdict::InfiniteLoop(infinite_loop);
    }

    Verdict::Clear
}

/// Run every stage independently.
pub fn analyze(code: &str) -> AnalysisReport {
    let source = SourceText::new(code);
    AnalysisReport {
        syntax_error: check_syntax(&source),
        memory: memory::scan(&source),
        infinite_loop: loops::scan(&source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(code: &str) -> Verdict {
        classify(&SourceText::new(code))
    }

    #[test]
    fn test_rule_engine_beats_bracket_scanner() {
        // Line 1 has an unexpected closer, line 2 trips the missing-colon rule.
        let source = SourceText::new("x = 1)\nif x > 5\n    pass");
        assert!(brackets::scan(&source).is_some());
        let diag = check_syntax(&source).unwrap();
        assert_eq!(diag.line, 2);
        assert!(diag.message.contains("'if'"));
    }

    #[test]
    fn test_bracket_fault_used_when_no_rule_fires() {
        let diag = check_syntax(&SourceText::new("x = 1)")).unwrap();
        assert_eq!(diag.message, "unmatched ')'");
        assert_eq!(diag.column, Some(6));
    }

    #[test]
    fn test_syntax_beats_memory_and_loops() {
        let code = "x = [0] * 10**9\nwhile True:\n    pass\nprint 'x'";
        assert!(matches!(verdict(code), Verdict::Syntax(_)));
    }

    #[test]
    fn test_memory_beats_loops() {
        let code = "while True:\n    x = [0] * 10**9";
        assert!(matches!(verdict(code), Verdict::Memory(_)));
    }

    #[test]
    fn test_loop_and_clear() {
        assert!(matches!(verdict("while True:\n    pass"), Verdict::InfiniteLoop(_)));
        assert_eq!(verdict("x = 2\nprint(x + 3)"), Verdict::Clear);
    }

    #[test]
    fn test_blank_submission_is_clear() {
        assert_eq!(verdict(""), Verdict::Clear);
        assert_eq!(verdict("  \n\t\n"), Verdict::Clear);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let code = "while True:\n    s = 'a' * 10**10\nif x = 3:\n    print(x";
        assert_eq!(analyze(code), analyze(code));
        let report = analyze(code);
        assert!(report.syntax_error.is_some());
        assert!(report.memory.is_overuse);
        assert!(report.infinite_loop.is_infinite);
    }
}
