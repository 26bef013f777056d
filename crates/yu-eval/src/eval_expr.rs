//! Expression folding and condition evaluation.
//!
//! Expressions carry no precedence. Numeric folding keeps an accumulator
//! and a composing value: `*` and `/` apply straight to the composing value,
//! while `+` and `-` commit it to the accumulator under the previous sign
//! and start a new one. An all-`+` expression with a string operand is
//! concatenation instead.

use std::fmt::Write as _;

use yu_types::ast::*;

use crate::context::Context;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{Number, Value};

impl Interpreter {
    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Evaluate an expression against `ctx`.
    pub fn eval_expression(&self, expr: &Expression, ctx: &Context) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(expr.terms.len());
        for term in &expr.terms {
            values.push(self.eval_term(term, ctx)?);
        }
        if values.len() == 1 {
            return Ok(values.pop().unwrap_or_default());
        }

        let concatenation = expr.operators.iter().all(|op| *op == ArithOp::Add)
            && values.iter().any(|v| matches!(v, Value::Str(_)));
        if concatenation {
            let mut out = String::new();
            for value in &values {
                let _ = write!(out, "{value}");
            }
            return Ok(Value::Str(out));
        }
        fold_numeric(&values, &expr.operators).map(Value::from)
    }

    /// Evaluate one operand, applying its `-` and then its `!`.
    pub fn eval_term(&self, term: &Term, ctx: &Context) -> EvalResult<Value> {
        let value = match &term.kind {
            TermKind::Number(n) => Value::Int(*n),
            TermKind::Str(s) => Value::Str(s.clone()),
            TermKind::Bool(b) => Value::Bool(*b),
            TermKind::Null => Value::Null,
            TermKind::Var(var) => ctx.get(var),
            TermKind::Group(inner) => self.eval_expression(inner, ctx)?,
        };
        let value = if term.negate {
            Value::from(value.to_number()?.negate())
        } else {
            value
        };
        Ok(if term.invert {
            Value::Bool(!value.is_true())
        } else {
            value
        })
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════════

    /// Apply `&&` and `||` in written order. Evaluation stops at the first
    /// `&&` reached with a false result or `||` reached with a true one.
    pub fn eval_condition(&self, cond: &ConditionalExpression, ctx: &Context) -> EvalResult<bool> {
        let Some((first, rest)) = cond.conditions.split_first() else {
            return Ok(false);
        };
        let mut result = self.eval_single_condition(first, ctx)?;
        for (op, next) in cond.operators.iter().zip(rest) {
            match op {
                BoolOp::And if !result => break,
                BoolOp::Or if result => break,
                _ => result = self.eval_single_condition(next, ctx)?,
            }
        }
        Ok(result)
    }

    fn eval_single_condition(&self, cond: &Condition, ctx: &Context) -> EvalResult<bool> {
        let left = self.eval_expression(&cond.left, ctx)?;
        match &cond.comparison {
            None => Ok(left.is_true()),
            Some((op, right)) => {
                let right = self.eval_expression(right, ctx)?;
                Ok(compare(*op, &left, &right))
            }
        }
    }
}

/// `==`, `!=` and the string operators compare string forms; ordering
/// compares numbers, with `null` as zero, and is false when either side is
/// not numeric.
pub fn compare(op: RelOp, left: &Value, right: &Value) -> bool {
    match op {
        RelOp::Eq => left.to_string() == right.to_string(),
        RelOp::NotEq => left.to_string() != right.to_string(),
        RelOp::StartsWith => left.to_string().starts_with(&right.to_string()),
        RelOp::Contains => left.to_string().contains(&right.to_string()),
        RelOp::EndsWith => left.to_string().ends_with(&right.to_string()),
        RelOp::Lt | RelOp::Gt | RelOp::LtEq | RelOp::GtEq => {
            let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
                return false;
            };
            match op {
                RelOp::Lt => l < r,
                RelOp::Gt => l > r,
                RelOp::LtEq => l <= r,
                _ => l >= r,
            }
        }
    }
}

/// Fold `values` joined by `operators` with the composing-accumulator rule.
/// Integers stay integers unless any operand is a float.
pub fn fold_numeric(values: &[Value], operators: &[ArithOp]) -> EvalResult<Number> {
    let mut numbers = values
        .iter()
        .map(Value::to_number)
        .collect::<EvalResult<Vec<_>>>()?;
    if numbers.iter().any(|n| matches!(n, Number::Float(_))) {
        for n in &mut numbers {
            *n = Number::Float(n.as_f64());
        }
    }

    let Some((&first, rest)) = numbers.split_first() else {
        return Ok(Number::Int(0));
    };
    let mut accumulator = Number::Int(0);
    let mut composing = first;
    let mut sign = ArithOp::Add;
    for (&op, &operand) in operators.iter().zip(rest) {
        match op {
            ArithOp::Add | ArithOp::Sub => {
                accumulator = apply(accumulator, sign, composing)?;
                composing = operand;
                sign = op;
            }
            ArithOp::Mul | ArithOp::Div => composing = apply(composing, op, operand)?,
        }
    }
    apply(accumulator, sign, composing)
}

fn apply(lhs: Number, op: ArithOp, rhs: Number) -> EvalResult<Number> {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => Ok(Number::Int(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => {
                if b == 0 {
                    return Err(EvalError::ArithmeticTrap(format!(
                        "integer division by zero ({a} / 0)"
                    )));
                }
                a.wrapping_div(b)
            }
        })),
        _ => {
            let (a, b) = (lhs.as_f64(), rhs.as_f64());
            Ok(Number::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Int(v)).collect()
    }

    #[test]
    fn test_composing_fold() {
        use ArithOp::*;
        assert_eq!(fold_numeric(&ints(&[2, 3, 4]), &[Add, Mul]).unwrap(), Number::Int(14));
        assert_eq!(fold_numeric(&ints(&[10, 2, 3]), &[Sub, Sub]).unwrap(), Number::Int(5));
        assert_eq!(
            fold_numeric(&ints(&[2, 3, 4, 5]), &[Mul, Add, Mul]).unwrap(),
            Number::Int(26)
        );
        assert_eq!(
            fold_numeric(&ints(&[20, 2, 5, 3]), &[Div, Sub, Mul]).unwrap(),
            Number::Int(-5)
        );
    }

    #[test]
    fn test_float_operand_widens_fold() {
        let values = vec![Value::Int(7), Value::Int(2), Value::Float(0.5)];
        assert_eq!(
            fold_numeric(&values, &[ArithOp::Div, ArithOp::Add]).unwrap(),
            Number::Float(4.0)
        );
    }

    #[test]
    fn test_integer_division_by_zero_traps() {
        assert!(matches!(
            fold_numeric(&ints(&[1, 0]), &[ArithOp::Div]),
            Err(EvalError::ArithmeticTrap(_))
        ));
        assert_eq!(
            fold_numeric(&[Value::Float(1.0), Value::Int(0)], &[ArithOp::Div]).unwrap(),
            Number::Float(f64::INFINITY)
        );
    }

    #[test]
    fn test_compare_forms() {
        let a = Value::from("alphabet");
        assert!(compare(RelOp::StartsWith, &a, &Value::from("alpha")));
        assert!(compare(RelOp::EndsWith, &a, &Value::from("bet")));
        assert!(compare(RelOp::Contains, &a, &Value::from("hab")));
        assert!(compare(RelOp::Eq, &Value::Int(3), &Value::from("3")));
        assert!(compare(RelOp::Lt, &Value::Int(2), &Value::Float(2.5)));
        assert!(!compare(RelOp::Lt, &Value::from("x"), &Value::Int(3)));
        assert!(compare(RelOp::GtEq, &Value::Null, &Value::Int(0)));
        assert!(compare(RelOp::Lt, &Value::Null, &Value::Int(3)));
        assert!(!compare(RelOp::Lt, &Value::Bool(true), &Value::Int(3)));
    }
}
