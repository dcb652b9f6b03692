// Formula evaluator - computes a Value from an expression AST

use crate::position::Position;
use crate::value::{ErrorKind, Value};

use super::parser::{Expr, Op, UnaryOp};

/// Evaluate an expression against a cell lookup.
///
/// The lookup resolves a referenced position to its current value, or `None`
/// when nothing occupies the position (never-written or blocked); an absent
/// cell counts as zero. Errors are contagious: any `#...!` operand becomes
/// the result of the whole expression, never a partial numeric result.
pub fn evaluate<F>(expr: &Expr, lookup: &F) -> Value
where
    F: Fn(Position) -> Option<Value>,
{
    match eval_number(expr, lookup) {
        Ok(n) => Value::Number(n),
        Err(kind) => Value::Error(kind),
    }
}

fn eval_number<F>(expr: &Expr, lookup: &F) -> Result<f64, ErrorKind>
where
    F: Fn(Position) -> Option<Value>,
{
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(pos) => {
            if !pos.is_valid() {
                return Err(ErrorKind::Ref);
            }
            match lookup(*pos) {
                None => Ok(0.0),
                Some(value) => coerce_number(&value),
            }
        }
        Expr::Unary { op, operand } => {
            let n = eval_number(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => n,
                UnaryOp::Minus => -n,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = eval_number(left, lookup)?;
            let rhs = eval_number(right, lookup)?;
            match op {
                Op::Add => Ok(lhs + rhs),
                Op::Sub => Ok(lhs - rhs),
                Op::Mul => Ok(lhs * rhs),
                Op::Div => {
                    if rhs == 0.0 {
                        Err(ErrorKind::Div0)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}

/// Numeric coercion for a referenced cell's value.
///
/// Empty text counts as zero; text that parses as a number is converted;
/// anything else is `#VALUE!`. An error value propagates unchanged.
fn coerce_number(value: &Value) -> Result<f64, ErrorKind> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Text(s) => {
            if s.is_empty() {
                Ok(0.0)
            } else {
                s.trim().parse::<f64>().map_err(|_| ErrorKind::Value)
            }
        }
        Value::Error(kind) => Err(*kind),
    }
}
