//! Arithmetic over `+ - * /` and parentheses
//!
//! A small recursive-descent parser. Operands are numeric and string
//! literals, variables, and calls the caller knows how to evaluate. Anything
//! the grammar or the operand types cannot handle makes the whole expression
//! unevaluable, and the caller falls back to the raw text.
//!
//! Parenthesis nesting is bounded by the caller's remaining nesting budget,
//! so a pathological expression fails instead of exhausting the stack.

use crate::error::{Error, Result};

use super::value::Value;

/// Longest string or list a repetition or concatenation may build
const MAX_SEQUENCE_LEN: usize = 10_000_000;

/// Supplies operand values the parser cannot compute on its own
pub(crate) trait Resolver {
    /// Current value of a variable
    fn variable(&self, name: &str) -> Option<Value>;

    /// Evaluate a call such as `area(2, 3)` found `nesting` levels deep in
    /// the expression; `Ok(None)` if unknown
    fn call(&mut self, text: &str, nesting: usize) -> Result<Option<Value>>;
}

enum Fail {
    Unevaluable,
    Error(Error),
}

impl From<Error> for Fail {
    fn from(err: Error) -> Self {
        Fail::Error(err)
    }
}

type Step<T> = std::result::Result<T, Fail>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Name(String),
    Call(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(expr: &str) -> Step<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                i += 1;
            }
            let text: String = chars[start..i].iter().filter(|&&c| c != '_').collect();
            let value = if text.contains('.') {
                Value::Float(text.parse().map_err(|_| Fail::Unevaluable)?)
            } else {
                match text.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::Float(text.parse().map_err(|_| Fail::Unevaluable)?),
                }
            };
            tokens.push(Token::Literal(value));
        } else if c == '\'' || c == '"' {
            let end = chars[i + 1..]
                .iter()
                .position(|&q| q == c)
                .map(|offset| i + 1 + offset)
                .ok_or(Fail::Unevaluable)?;
            tokens.push(Token::Literal(Value::Str(chars[i + 1..end].iter().collect())));
            i = end + 1;
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j] == ' ' {
                j += 1;
            }
            if chars.get(j) == Some(&'(') {
                let close = matching_close(&chars, j).ok_or(Fail::Unevaluable)?;
                tokens.push(Token::Call(chars[start..=close].iter().collect()));
                i = close + 1;
            } else {
                tokens.push(Token::Name(name));
            }
        } else if matches!(c, '+' | '-' | '*' | '/') {
            tokens.push(Token::Op(c));
            i += 1;
        } else if c == '(' {
            tokens.push(Token::Open);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::Close);
            i += 1;
        } else {
            return Err(Fail::Unevaluable);
        }
    }

    Ok(tokens)
}

/// Index of the `)` matching the `(` at `open`, skipping string literals.
fn matching_close(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (idx, &c) in chars.iter().enumerate().skip(open) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

struct Parser<'r> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    limit: usize,
    resolver: &'r mut dyn Resolver,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Descend one nesting level, failing once the budget is spent.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Step<T>) -> Step<T> {
        if self.depth >= self.limit {
            return Err(Fail::Error(Error::Evaluation(
                "SyntaxError: too many nested parentheses".to_string(),
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Step<Value> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Step<Value> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Step<Value> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                match self.nested(Self::unary)? {
                    Value::Int(n) => n.checked_neg().map(Value::Int).ok_or(Fail::Unevaluable),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    _ => Err(Fail::Unevaluable),
                }
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                match self.nested(Self::unary)? {
                    value @ (Value::Int(_) | Value::Float(_)) => Ok(value),
                    _ => Err(Fail::Unevaluable),
                }
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Step<Value> {
        match self.next() {
            Some(Token::Literal(value)) => Ok(value),
            Some(Token::Name(name)) => self.resolver.variable(&name).ok_or(Fail::Unevaluable),
            Some(Token::Call(text)) => self
                .resolver
                .call(&text, self.depth)?
                .ok_or(Fail::Unevaluable),
            Some(Token::Open) => {
                let value = self.nested(Self::expression)?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err(Fail::Unevaluable),
                }
            }
            _ => Err(Fail::Unevaluable),
        }
    }
}

fn check_len(len: usize) -> Step<()> {
    if len > MAX_SEQUENCE_LEN {
        return Err(Fail::Error(Error::Evaluation(
            "MemoryError: sequence result is too large".to_string(),
        )));
    }
    Ok(())
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Step<Vec<T>> {
    let times = usize::try_from(times.max(0)).map_err(|_| Fail::Unevaluable)?;
    check_len(items.len().saturating_mul(times))?;
    Ok((0..times).flat_map(|_| items.iter().cloned()).collect())
}

fn binary(op: char, left: Value, right: Value) -> Step<Value> {
    use Value::*;

    match (op, left, right) {
        ('+', Int(a), Int(b)) => Ok(a.checked_add(b).map(Int).unwrap_or(Float(a as f64 + b as f64))),
        ('-', Int(a), Int(b)) => Ok(a.checked_sub(b).map(Int).unwrap_or(Float(a as f64 - b as f64))),
        ('*', Int(a), Int(b)) => Ok(a.checked_mul(b).map(Int).unwrap_or(Float(a as f64 * b as f64))),
        ('+', Str(a), Str(b)) => {
            check_len(a.len().saturating_add(b.len()))?;
            Ok(Str(a + &b))
        }
        ('+', List(mut a), List(b)) => {
            check_len(a.len().saturating_add(b.len()))?;
            a.extend(b);
            Ok(List(a))
        }
        ('*', Str(s), Int(n)) | ('*', Int(n), Str(s)) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Str(repeat(&chars, n)?.into_iter().collect()))
        }
        ('*', List(items), Int(n)) | ('*', Int(n), List(items)) => Ok(List(repeat(&items, n)?)),
        (op, left, right) => {
            let (a, b) = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(Fail::Unevaluable),
            };
            match op {
                '+' => Ok(Float(a + b)),
                '-' => Ok(Float(a - b)),
                '*' => Ok(Float(a * b)),
                '/' if b == 0.0 => Err(Fail::Error(Error::Evaluation(
                    "ZeroDivisionError: division by zero".to_string(),
                ))),
                '/' => Ok(Float(a / b)),
                _ => Err(Fail::Unevaluable),
            }
        }
    }
}

/// Apply a single operator, as used by augmented assignment.
/// `Ok(None)` when the operand types do not support it.
pub(crate) fn apply(op: char, left: Value, right: Value) -> Result<Option<Value>> {
    match binary(op, left, right) {
        Ok(value) => Ok(Some(value)),
        Err(Fail::Unevaluable) => Ok(None),
        Err(Fail::Error(err)) => Err(err),
    }
}

/// Evaluate `expr` with at most `limit` levels of nesting; `Ok(None)` when
/// it is not plain arithmetic.
pub(crate) fn evaluate(expr: &str, resolver: &mut dyn Resolver, limit: usize) -> Result<Option<Value>> {
    let tokens = match tokenize(expr) {
        Ok(tokens) if !tokens.is_empty() => tokens,
        Ok(_) | Err(Fail::Unevaluable) => return Ok(None),
        Err(Fail::Error(err)) => return Err(err),
    };

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        limit,
        resolver,
    };
    let result = parser.expression().and_then(|value| {
        if parser.pos == parser.tokens.len() {
            Ok(value)
        } else {
            Err(Fail::Unevaluable)
        }
    });

    match result {
        Ok(value) => Ok(Some(value)),
        Err(Fail::Unevaluable) => Ok(None),
        Err(Fail::Error(err)) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Vars(HashMap<String, Value>);

    impl Resolver for Vars {
        fn variable(&self, name: &str) -> Option<Value> {
            self.0.get(name).cloned()
        }

        fn call(&mut self, text: &str, _nesting: usize) -> Result<Option<Value>> {
            Ok((text == "seven()").then_some(Value::Int(7)))
        }
    }

    fn eval(expr: &str) -> Result<Option<Value>> {
        let mut vars = Vars(HashMap::from([
            ("x".to_string(), Value::Int(2)),
            ("name".to_string(), Value::Str("Ada".to_string())),
            ("flag".to_string(), Value::Bool(true)),
        ]));
        evaluate(expr, &mut vars, 200)
    }

    #[test]
    fn test_precedence_and_parentheses() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Some(Value::Int(7)));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Some(Value::Int(9)));
        assert_eq!(eval("10 - 4 - 3").unwrap(), Some(Value::Int(3)));
        assert_eq!(eval("-x * 2").unwrap(), Some(Value::Int(-4)));
    }

    #[test]
    fn test_division_is_float() {
        assert_eq!(eval("7 / 2").unwrap(), Some(Value::Float(3.5)));
        assert_eq!(eval("4 / 2").unwrap(), Some(Value::Float(2.0)));
        assert_eq!(eval("1.5 + 1").unwrap(), Some(Value::Float(2.5)));
    }

    #[test]
    fn test_variables_and_calls() {
        assert_eq!(eval("x + 3").unwrap(), Some(Value::Int(5)));
        assert_eq!(eval("seven() * x").unwrap(), Some(Value::Int(14)));
        assert_eq!(eval("unknown + 1").unwrap(), None);
        assert_eq!(eval("other() + 1").unwrap(), None);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            eval("'Hello, ' + name").unwrap(),
            Some(Value::Str("Hello, Ada".to_string()))
        );
        assert_eq!(eval("'ab' * 2").unwrap(), Some(Value::Str("abab".to_string())));
        assert_eq!(eval("name - 1").unwrap(), None);
    }

    #[test]
    fn test_unsupported_syntax_is_unevaluable() {
        assert_eq!(eval("x % 2").unwrap(), None);
        assert_eq!(eval("x ** 2").unwrap(), None);
        assert_eq!(eval("(1 + 2").unwrap(), None);
        assert_eq!(eval("flag + 1").unwrap(), None);
        assert_eq!(eval("1 2").unwrap(), None);
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let err = eval("x / 0").unwrap_err();
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_huge_repetition_is_an_error() {
        assert!(eval("'a' * 100000000000").is_err());
    }

    #[test]
    fn test_list_repetition() {
        let list = Value::List(vec![Value::Str("a".into()), Value::Int(1)]);
        let repeated = apply('*', list, Value::Int(2)).unwrap().unwrap();
        assert_eq!(repeated.to_string(), "['a', 1, 'a', 1]");
        assert_eq!(
            apply('*', Value::Int(0), Value::List(vec![Value::None])).unwrap(),
            Some(Value::List(vec![]))
        );
    }

    #[test]
    fn test_concatenation_is_capped() {
        let half = Value::Str("a".repeat(MAX_SEQUENCE_LEN / 2 + 1));
        let err = apply('+', half.clone(), half).unwrap_err();
        assert_eq!(err.to_string(), "MemoryError: sequence result is too large");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let expr = format!("{}1 + 1{}", "(".repeat(1000), ")".repeat(1000));
        let err = eval(&expr).unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: too many nested parentheses");

        let expr = format!("{}1{}", "(".repeat(150), ")".repeat(150));
        assert_eq!(eval(&expr).unwrap(), Some(Value::Int(1)));
        assert!(eval(&format!("{}1", "-".repeat(1000))).is_err());
    }

    #[test]
    fn test_apply() {
        assert_eq!(apply('+', Value::Int(1), Value::Int(2)).unwrap(), Some(Value::Int(3)));
        assert_eq!(apply('+', Value::Int(1), Value::None).unwrap(), None);
    }
}
