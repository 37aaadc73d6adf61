//! Simulated interpreter for a tiny subset of Python
//!
//! Two passes over the source. First every `def` is extracted; then the
//! remaining lines are walked top to bottom. Only two statement forms do
//! anything:
//!
//! - `print(...)` appends a line to the captured output
//! - `name = expr` (and `name += expr`) binds a variable
//!
//! Every other line, including the bodies of functions, is skipped.
//! Functions run only when an expression calls them, and a call yields the
//! value of the first `return` in the body.
//!
//! The evaluator never fails on input it does not understand: unresolved
//! expressions evaluate to their own source text. It does fail on input
//! that nests deeper than `max_nesting` or calls deeper than
//! `max_call_depth`, and it stops between statements once cancelled.

mod arith;
mod functions;
mod value;

pub use functions::{Function, Param};
pub use value::Value;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::{indentation, lexer::strip_comment, SourceText};
use crate::config::InterpreterConfig;
use crate::error::{Error, Result};

use arith::Resolver;

/// Variables visible to an expression
pub type Environment = HashMap<String, Value>;

static PRINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^print\s*\((.*)\)$").unwrap());
static ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*=\s*([^=].*)$").unwrap());
static AUG_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*([+\-*/])=\s*(.+)$").unwrap());
static RETURN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^return\s+(.+)$").unwrap());
static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^(?:"([^"]*)"|'([^']*)')$"#).unwrap());
static FSTRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[fF](?:"(.*)"|'(.*)')$"#).unwrap());
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").unwrap());
static PRECISION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.(\d+)f$").unwrap());
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d[\d_]*$").unwrap());
static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(?:\d+\.\d*|\.\d+)$").unwrap());

/// Most fractional digits an f-string precision may ask for
const MAX_PRECISION: usize = 100;

/// Split on commas that are not nested in brackets or strings.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(text[start..idx].trim());
                    start = idx + 1;
                }
                _ => {}
            },
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts.retain(|part| !part.is_empty());
    parts
}

/// `name(args)` where the closing paren is the last character and matches
/// the first opening one.
fn split_call(expr: &str) -> Option<(&str, &str)> {
    let open = expr.find('(')?;
    let name = expr[..open].trim_end();
    if name.is_empty()
        || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !expr.ends_with(')')
    {
        return None;
    }

    let inner = &expr[open + 1..expr.len() - 1];
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return None;
                    }
                }
                _ => {}
            },
        }
    }
    (depth == 0).then_some((name, inner))
}

/// `[...]` where the outer brackets enclose the whole expression.
fn list_contents(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix('[')?.strip_suffix(']')?;
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth < 0 {
                        return None;
                    }
                }
                _ => {}
            },
        }
    }
    Some(inner)
}

fn format_placeholder(value: &Value, spec: Option<&str>) -> String {
    let precision = spec
        .and_then(|spec| PRECISION.captures(spec.trim()))
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .map(|digits| digits.min(MAX_PRECISION));
    match (precision, value.as_f64()) {
        (Some(digits), Some(number)) => format!("{:.*}", digits, number),
        _ => value.to_string(),
    }
}

struct Evaluator<'f> {
    functions: &'f HashMap<String, Function>,
    max_depth: usize,
    depth: usize,
    max_nesting: usize,
    nesting: usize,
}

/// An evaluator bound to one environment, handed to the arithmetic parser
struct Scope<'s, 'f> {
    evaluator: &'s mut Evaluator<'f>,
    env: &'s Environment,
}

impl Resolver for Scope<'_, '_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.env.get(name).cloned()
    }

    fn call(&mut self, text: &str, nesting: usize) -> Result<Option<Value>> {
        let Some((name, _)) = split_call(text) else {
            return Ok(None);
        };
        if !matches!(name, "len" | "type") && !self.evaluator.functions.contains_key(name) {
            return Ok(None);
        }
        // Parentheses around the call count against the same budget.
        self.evaluator.nesting += nesting;
        let value = self.evaluator.eval(text, self.env);
        self.evaluator.nesting -= nesting;
        value.map(Some)
    }
}

impl<'f> Evaluator<'f> {
    fn new(functions: &'f HashMap<String, Function>, config: &InterpreterConfig) -> Self {
        Evaluator {
            functions,
            max_depth: config.max_call_depth,
            depth: 0,
            max_nesting: config.max_nesting,
            nesting: 0,
        }
    }

    fn eval(&mut self, expr: &str, env: &Environment) -> Result<Value> {
        if self.nesting >= self.max_nesting {
            return Err(Error::Evaluation(
                "RecursionError: maximum recursion depth exceeded".to_string(),
            ));
        }
        self.nesting += 1;
        let value = self.eval_nested(expr, env);
        self.nesting -= 1;
        value
    }

    fn eval_nested(&mut self, expr: &str, env: &Environment) -> Result<Value> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Value::Str(String::new()));
        }

        if let Some(caps) = STRING_LITERAL.captures(expr) {
            let text = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            return Ok(Value::Str(text.to_string()));
        }

        if let Some(caps) = FSTRING.captures(expr) {
            let template = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            return self.fstring(template, env).map(Value::Str);
        }

        if let Some((name, args)) = split_call(expr) {
            match name {
                "type" => {
                    let value = self.eval(args, env)?;
                    return Ok(Value::Str(format!("<class '{}'>", value.type_name())));
                }
                "len" => {
                    let value = self.eval(args, env)?;
                    return Ok(Value::Int(value.len() as i64));
                }
                _ => {
                    let functions = self.functions;
                    if let Some(function) = functions.get(name) {
                        return self.call(function, args, env);
                    }
                }
            }
        }

        if INTEGER.is_match(expr) {
            let digits = expr.replace('_', "");
            return Ok(match digits.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => Value::Float(digits.parse().unwrap_or(f64::INFINITY)),
            });
        }
        if FLOAT.is_match(expr) {
            if let Ok(f) = expr.parse::<f64>() {
                return Ok(Value::Float(f));
            }
        }

        match expr {
            "True" => return Ok(Value::Bool(true)),
            "False" => return Ok(Value::Bool(false)),
            "None" => return Ok(Value::None),
            _ => {}
        }

        if let Some(inner) = list_contents(expr) {
            let items = split_top_level(inner)
                .into_iter()
                .map(|item| self.eval(item, env))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Value::List(items));
        }

        if expr.contains(['+', '-', '*', '/']) {
            let limit = self.max_nesting.saturating_sub(self.nesting);
            let mut scope = Scope {
                evaluator: self,
                env,
            };
            return Ok(arith::evaluate(expr, &mut scope, limit)?
                .unwrap_or_else(|| Value::Str(expr.to_string())));
        }

        Ok(env
            .get(expr)
            .cloned()
            .unwrap_or_else(|| Value::Str(expr.to_string())))
    }

    fn fstring(&mut self, template: &str, env: &Environment) -> Result<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            out.push_str(&template[last..whole.start]);
            let (expr, spec) = match caps[1].rsplit_once(':') {
                Some((expr, spec)) if PRECISION.is_match(spec.trim()) => (expr, Some(spec)),
                _ => (&caps[1], None),
            };
            let value = self.eval(expr, env)?;
            out.push_str(&format_placeholder(&value, spec));
            last = whole.end;
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn call(&mut self, function: &Function, args: &str, env: &Environment) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(Error::Evaluation(
                "RecursionError: maximum recursion depth exceeded".to_string(),
            ));
        }

        let args = split_top_level(args)
            .into_iter()
            .map(|arg| self.eval(arg, env))
            .collect::<Result<Vec<_>>>()?;

        let mut local = env.clone();
        for (idx, param) in function.params.iter().enumerate() {
            let value = match (args.get(idx), &param.default) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => self.eval(default, env)?,
                (None, None) => continue,
            };
            local.insert(param.name.clone(), value);
        }

        self.depth += 1;
        let result = self.run_body(function, &mut local);
        self.depth -= 1;
        result
    }

    /// Scan the body for the first `return`, applying plain assignments
    /// met on the way.
    fn run_body(&mut self, function: &Function, local: &mut Environment) -> Result<Value> {
        for line in &function.body {
            let line = strip_comment(line).trim();
            if let Some(caps) = RETURN.captures(line) {
                return self.eval(&caps[1], local);
            }
            if let Some(caps) = ASSIGN.captures(line) {
                let value = self.eval(&caps[2], local)?;
                local.insert(caps[1].to_string(), value);
            }
        }
        Ok(Value::None)
    }

    /// Execute one top-level statement, returning a printed line if any.
    fn statement(&mut self, line: &str, env: &mut Environment) -> Result<Option<String>> {
        if let Some(caps) = PRINT.captures(line) {
            let parts = split_top_level(&caps[1])
                .into_iter()
                .map(|arg| self.eval(arg, env).map(|value| value.to_string()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Some(parts.join(" ")));
        }

        if let Some(caps) = AUG_ASSIGN.captures(line) {
            let op = caps[2].chars().next().unwrap_or('+');
            let right = self.eval(&caps[3], env)?;
            if let Some(left) = env.get(&caps[1]).cloned() {
                if let Some(value) = arith::apply(op, left, right)? {
                    env.insert(caps[1].to_string(), value);
                }
            }
            return Ok(None);
        }

        if let Some(caps) = ASSIGN.captures(line) {
            let value = self.eval(&caps[2], env)?;
            env.insert(caps[1].to_string(), value);
        }

        Ok(None)
    }
}

/// Evaluate a single expression against `env` with the given functions.
pub fn evaluate(
    expr: &str,
    env: &Environment,
    functions: &HashMap<String, Function>,
    config: &InterpreterConfig,
) -> Result<Value> {
    Evaluator::new(functions, config).eval(expr, env)
}

/// Run a program with the given limits and return what it printed.
pub fn run_with(code: &str, config: &InterpreterConfig) -> Result<String> {
    run_cancellable(code, config, &AtomicBool::new(false))
}

/// Like [`run_with`], but gives up before the next statement once `cancel`
/// is set.
pub fn run_cancellable(code: &str, config: &InterpreterConfig, cancel: &AtomicBool) -> Result<String> {
    let source = SourceText::new(code);
    let functions = functions::extract(&source);
    let mut evaluator = Evaluator::new(&functions, config);
    let mut env = Environment::new();
    let mut output: Vec<String> = Vec::new();
    let mut function_indent: Option<usize> = None;

    for raw in source.lines() {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Timeout("execution cancelled".to_string()));
        }
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let indent = indentation(raw);
        if let Some(header_indent) = function_indent {
            if indent > header_indent {
                continue;
            }
            function_indent = None;
        }
        if functions::is_def_header(line) {
            function_indent = Some(indent);
            continue;
        }

        if let Some(printed) = evaluator.statement(line, &mut env)? {
            output.push(printed);
        }
    }

    Ok(output.join("\n"))
}

/// Run a program with default limits.
pub fn run(code: &str) -> Result<String> {
    run_with(code, &InterpreterConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: &str) -> String {
        run(code).unwrap()
    }

    #[test]
    fn test_print_arithmetic_with_variable() {
        assert_eq!(output("x = 2\nprint(x + 3)"), "5");
    }

    #[test]
    fn test_print_literals() {
        assert_eq!(
            output("print('hi')\nprint(42)\nprint(True)\nprint(None)\nprint([1, 'a'])"),
            "hi\n42\nTrue\nNone\n[1, 'a']"
        );
    }

    #[test]
    fn test_print_multiple_arguments() {
        assert_eq!(output("name = 'Ada'\nprint('Hello,', name)\nprint()"), "Hello, Ada\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output("name = \"Ada\"\nprint(\"Hi, \" + name + \"!\")"), "Hi, Ada!");
    }

    #[test]
    fn test_fstring() {
        let code = "name = 'Ada'\nage = 36\nprint(f\"{name} is {age + 1}\")\nprint(f'{7 / 2:.2f}')";
        assert_eq!(output(code), "Ada is 37\n3.50");
    }

    #[test]
    fn test_type_and_len() {
        let code = "xs = [1, 2, 3]\nprint(type(xs))\nprint(len(xs))\nprint(len('hey') + 1)\nprint(type(1.5))";
        assert_eq!(output(code), "<class 'list'>\n3\n4\n<class 'float'>");
    }

    #[test]
    fn test_function_call_returns_first_return() {
        let code = "def add(a, b):\n    return a + b\n    return 0\n\nprint(add(2, 3))";
        assert_eq!(output(code), "5");
    }

    #[test]
    fn test_function_applies_assignments_before_return() {
        let code = "def area(w, h=2):\n    result = w * h\n    return result\nprint(area(4))";
        assert_eq!(output(code), "8");
    }

    #[test]
    fn test_function_without_return_is_none() {
        assert_eq!(output("def f():\n    pass\nx = f()\nprint(x)"), "None");
    }

    #[test]
    fn test_function_bodies_are_not_run_inline() {
        let code = "def shout():\n    print('inside')\n    return 1\nprint('outside')";
        assert_eq!(output(code), "outside");
    }

    #[test]
    fn test_calls_inside_arithmetic() {
        let code = "def double(n):\n    return n * 2\nprint(double(3) + double(4))";
        assert_eq!(output(code), "14");
    }

    #[test]
    fn test_augmented_assignment() {
        assert_eq!(output("total = 1\ntotal += 4\ntotal *= 2\nprint(total)"), "10");
    }

    #[test]
    fn test_unresolved_expressions_pass_through() {
        assert_eq!(output("print(mystery)"), "mystery");
        assert_eq!(output("print(x % 2)"), "x % 2");
        assert_eq!(output("import math\nprint(math.pi)"), "math.pi");
    }

    #[test]
    fn test_comments_are_stripped() {
        assert_eq!(output("x = 1  # one\nprint(x)  # show"), "1");
    }

    #[test]
    fn test_division_by_zero_is_error() {
        let err = run("print(1 / 0)").unwrap_err();
        assert!(matches!(err, Error::Evaluation(_)));
    }

    #[test]
    fn test_recursion_is_bounded() {
        let code = "def loop(n):\n    return loop(n)\nprint(loop(1))";
        let err = run(code).unwrap_err();
        assert_eq!(err.to_string(), "RecursionError: maximum recursion depth exceeded");
    }

    #[test]
    fn test_deeply_nested_expressions_fail_cleanly() {
        let parens = format!("print({}1 + 1{})", "(".repeat(1000), ")".repeat(1000));
        let err = run(&parens).unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: too many nested parentheses");

        let lists = format!("print({}1{})", "[".repeat(1000), "]".repeat(1000));
        assert!(matches!(run(&lists).unwrap_err(), Error::Evaluation(_)));

        let shallow = format!("print({}1 + 1{})", "(".repeat(100), ")".repeat(100));
        assert_eq!(output(&shallow), "2");
    }

    #[test]
    fn test_nesting_budget_covers_calls_in_parentheses() {
        let config = InterpreterConfig {
            max_nesting: 10,
            ..InterpreterConfig::default()
        };
        let code = format!("def one():\n    return 1\nprint({}one() + 1{})", "(".repeat(9), ")".repeat(9));
        assert!(run_with(&code, &config).is_err());
        assert_eq!(run_with("def one():\n    return 1\nprint((one() + 1))", &config).unwrap(), "2");
    }

    #[test]
    fn test_concatenation_growth_is_bounded() {
        let mut code = String::from("s = 'a' * 1000000\n");
        for _ in 0..10 {
            code.push_str("s = s + s\n");
        }
        let err = run(&code).unwrap_err();
        assert_eq!(err.to_string(), "MemoryError: sequence result is too large");
    }

    #[test]
    fn test_cancelled_run_stops() {
        let cancel = AtomicBool::new(true);
        let err = run_cancellable("print(1)", &InterpreterConfig::default(), &cancel).unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[test]
    fn test_large_precision_is_clamped() {
        let printed = output("print(f'{1:.70000f}')");
        assert_eq!(printed.len(), 2 + MAX_PRECISION);
    }

    #[test]
    fn test_evaluate_expression() {
        let env = Environment::from([("x".to_string(), Value::Int(4))]);
        let functions = HashMap::new();
        let value = evaluate("[x, x * 2]", &env, &functions, &InterpreterConfig::default()).unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(4), Value::Int(8)]));
    }

    #[test]
    fn test_split_helpers() {
        assert_eq!(split_top_level("a, 'b, c', f(1, 2)"), vec!["a", "'b, c'", "f(1, 2)"]);
        assert!(split_top_level("  ").is_empty());
        assert_eq!(split_call("f(1)"), Some(("f", "1")));
        assert_eq!(split_call("f(1) + g(2)"), None);
        assert_eq!(list_contents("[1] + [2]"), None);
    }
}
