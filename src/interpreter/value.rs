//! Runtime values of the simulated interpreter
//!
//! Only the handful of Python types the evaluator can produce:
//!
//! - [`Value::Str`]: text
//! - [`Value::Int`] / [`Value::Float`]: numbers, kept apart so `type()` and
//!   printing match Python
//! - [`Value::Bool`], [`Value::None`]
//! - [`Value::List`]: a flat list of values

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Value>),
}

impl Value {
    /// Python type name as reported by `type()`
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::None => "NoneType",
            Value::List(_) => "list",
        }
    }

    /// Length for `len()`; values without a length report 0
    pub fn len(&self) -> usize {
        match self {
            Value::Str(s) => s.chars().count(),
            Value::List(items) => items.len(),
            _ => 0,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Python `repr()`: like `Display` but strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => {
                if s.contains('\'') && !s.contains('"') {
                    format!("\"{}\"", s)
                } else {
                    format!("'{}'", s.replace('\'', "\\'"))
                }
            }
            other => other.to_string(),
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::None => write!(f, "None"),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", inner.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_python() {
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_list_display_uses_repr() {
        let list = Value::List(vec![
            Value::Int(1),
            Value::Str("a".into()),
            Value::Str("it's".into()),
            Value::List(vec![]),
        ]);
        assert_eq!(list.to_string(), "[1, 'a', \"it's\", []]");
    }

    #[test]
    fn test_type_names_and_len() {
        assert_eq!(Value::Float(1.5).type_name(), "float");
        assert_eq!(Value::None.type_name(), "NoneType");
        assert_eq!(Value::Str("héllo".into()).len(), 5);
        assert_eq!(Value::List(vec![Value::None; 3]).len(), 3);
        assert_eq!(Value::Int(42).len(), 0);
    }
}
