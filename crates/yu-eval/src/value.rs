//! Runtime values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EvalError, EvalResult};

/// A runtime value held in a variable store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A host-supplied sequence; `for` can iterate it.
    Array(Vec<Value>),
}

/// A value coerced for arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Int(i) => Number::Int(i.wrapping_neg()),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Parse a numeric string: a lexeme containing `.` is floating point,
/// anything else must be an integer.
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.contains('.') {
        text.parse::<f64>().ok().map(Number::Float)
    } else {
        text.parse::<i64>().ok().map(Number::Int)
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness is textual: only values whose string form is `true`.
    pub fn is_true(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Str(s) => s == "true",
            _ => false,
        }
    }

    /// Coerce for arithmetic: bools are 1/0, null is 0, strings are parsed.
    pub fn to_number(&self) -> EvalResult<Number> {
        match self {
            Value::Null => Ok(Number::Int(0)),
            Value::Bool(b) => Ok(Number::Int(i64::from(*b))),
            Value::Int(i) => Ok(Number::Int(*i)),
            Value::Float(f) => Ok(Number::Float(*f)),
            Value::Str(s) => parse_number(s).ok_or_else(|| {
                EvalError::TypeMismatch(format!("cannot use string '{s}' as a number"))
            }),
            Value::Array(_) => Err(EvalError::TypeMismatch(
                "cannot use an array as a number".to_string(),
            )),
        }
    }

    /// Numeric view used by ordering comparisons; `None` when not numeric.
    /// An unset variable reads as zero, as it does in arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null => Some(0.0),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => parse_number(s).map(Number::as_f64),
            _ => None,
        }
    }

    /// Integer view used by `for` ranges.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(
            Value::Array(vec![Value::Int(1), "a".into()]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_parse_number_helper() {
        assert_eq!(parse_number("42"), Some(Number::Int(42)));
        assert_eq!(parse_number("4.5"), Some(Number::Float(4.5)));
        assert_eq!(parse_number("4x"), None);
        assert_eq!(parse_number("1e3"), None);
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(Value::Bool(true).to_number().unwrap(), Number::Int(1));
        assert_eq!(Value::Null.to_number().unwrap(), Number::Int(0));
        assert_eq!(Value::from("7").to_number().unwrap(), Number::Int(7));
        assert!(matches!(
            Value::from("seven").to_number(),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_truthiness_is_textual() {
        assert!(Value::Bool(true).is_true());
        assert!(Value::from("true").is_true());
        assert!(!Value::from("yes").is_true());
        assert!(!Value::Int(1).is_true());
    }

    #[test]
    fn test_integer_view() {
        assert_eq!(Value::Int(5).as_integer(), Some(5));
        assert_eq!(Value::from("12").as_integer(), Some(12));
        assert_eq!(Value::Float(3.0).as_integer(), Some(3));
        assert_eq!(Value::Float(3.5).as_integer(), None);
        assert_eq!(Value::Null.as_integer(), None);
    }

    #[test]
    fn test_serde_untagged() {
        let v = Value::Array(vec![Value::Int(1), Value::Str("x".into()), Value::Null]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"[1,"x",null]"#);
    }
}
