//! End-to-end behavior of the analysis pipeline and the simulated executor

use std::time::Duration;

use fallback_runner::analysis::{analyze, check_syntax, classify, ErrorKind, SourceText, Verdict};
use fallback_runner::sandbox::{CodeExecutor, ExecutionRequest, SimulatedExecutor};
use fallback_runner::Config;

fn fast_executor() -> SimulatedExecutor {
    let mut config = Config::default();
    config.executor.memory_delay_cap = Duration::from_millis(5);
    config.executor.loop_delay_cap = Duration::from_millis(5);
    SimulatedExecutor::new(&config)
}

#[test]
fn missing_colon_reports_if_on_line_one() {
    let report = analyze("if x > 5");
    let diag = report.syntax_error.expect("syntax error");
    assert_eq!(diag.kind, ErrorKind::SyntaxError);
    assert_eq!(diag.line, 1);
    assert!(diag.message.contains("if"));
}

#[test]
fn unclosed_paren_asks_for_one_closer() {
    let diag = analyze("print(1, 2").syntax_error.expect("syntax error");
    assert!(diag.suggestion.contains("1 closing parenthesis"));
}

#[test]
fn list_replication_over_limit_is_memory_overuse() {
    let report = analyze("x = [0] * 100000000");
    assert!(report.memory.is_overuse);
    assert!(report.memory.message.contains("100,000,000"));
}

#[test]
fn while_true_needs_a_deeper_break() {
    assert!(analyze("while True:\n    print('hi')").infinite_loop.is_infinite);
    assert!(!analyze("while True:\n    print('hi')\n    break").infinite_loop.is_infinite);
    assert!(analyze("while True:\n    print('hi')\nbreak_here = 1").infinite_loop.is_infinite);
}

#[test]
fn rule_catalog_takes_priority_over_bracket_scanner() {
    let source = SourceText::new("values = [1, 2]]\nwhile x > 0\n    x -= 1");
    let diag = check_syntax(&source).expect("syntax error");
    assert_eq!(diag.line, 2);
    assert!(diag.message.contains("'while'"));
}

#[test]
fn static_stages_are_idempotent() {
    let samples = [
        "if x > 5",
        "print(1, 2",
        "x = [0] * 100000000",
        "while True:\n    print('hi')",
        "x = 2\nprint(x + 3)",
        "def f(:\n  return 'unterminated",
    ];
    for code in samples {
        let source = SourceText::new(code);
        assert_eq!(classify(&source), classify(&source), "{code}");
        assert_eq!(analyze(code), analyze(code), "{code}");
    }
}

#[tokio::test]
async fn simple_program_prints_its_output() {
    let request = ExecutionRequest::python("x = 2\nprint(x + 3)").with_timeout_secs(5.0);
    let result = fast_executor().execute(request).await.unwrap();
    assert_eq!(result.output, "5");
    assert_eq!(result.error, None);
    assert!(!result.timeout);
}

#[tokio::test]
async fn late_interpreter_result_is_discarded() {
    let executor = fast_executor().with_interpreter(|_, _| {
        std::thread::sleep(Duration::from_millis(400));
        Ok("too late".to_string())
    });
    let request = ExecutionRequest::python("print('too late')").with_timeout_secs(0.1);
    let result = executor.execute(request).await.unwrap();
    assert!(result.timeout);
    assert_eq!(result.execution_time_ms, 100);
    assert!(!result.output.contains("too late"));
}

#[tokio::test]
async fn at_most_one_failure_flag_is_set() {
    let executor = fast_executor();
    let samples = [
        "if x > 5",
        "x = [0] * 100000000\nwhile True:\n    pass",
        "while True:\n    s = 'ab'",
        "print(1 / 0)",
        "def f(n):\n    return n * 2\nprint(f(21))",
        "while True:\n    x = [0] * 10**9\nprint 'x'",
    ];
    for code in samples {
        let result = executor.execute(ExecutionRequest::python(code)).await.unwrap();
        assert!(result.failure_count() <= 1, "{code}: {result:?}");
    }
}

#[tokio::test]
async fn failure_categories_follow_priority() {
    let executor = fast_executor();

    let both = "x = [0] * 100000000\nwhile True:\n    pass";
    let result = executor.execute(ExecutionRequest::python(both)).await.unwrap();
    assert!(result.memory_exceeded);
    assert!(!result.timeout);

    let result = executor
        .execute(ExecutionRequest::python("while True:\n    pass"))
        .await
        .unwrap();
    assert!(result.timeout);
    assert!(matches!(
        classify(&SourceText::new("while True:\n    pass")),
        Verdict::InfiniteLoop(_)
    ));
}

#[tokio::test]
async fn function_calls_run_in_the_interpreter() {
    let code = "def greet(name):\n    return f'Hello, {name}!'\n\nprint(greet('Ada'))\nprint(type(3.5))";
    let result = fast_executor().execute(ExecutionRequest::python(code)).await.unwrap();
    assert_eq!(result.output, "Hello, Ada!\n<class 'float'>");
}
