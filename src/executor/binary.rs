//! Arithmetic between two measure columns.

use crate::model::{BinaryOperator, Value};

/// `left <op> right` for one row. Integer operands stay integers except for
/// division; `NULL`, non-numeric operands, overflow and division by zero
/// give `NULL`.
pub fn apply(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let result = match operator {
            BinaryOperator::Plus => a.checked_add(*b),
            BinaryOperator::Minus => a.checked_sub(*b),
            BinaryOperator::Multiply => a.checked_mul(*b),
            BinaryOperator::Divide => return divide(*a as f64, *b as f64),
        };
        return result.map(Value::Int).unwrap_or(Value::Null);
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Value::Null;
    };
    match operator {
        BinaryOperator::Plus => Value::Float(a + b),
        BinaryOperator::Minus => Value::Float(a - b),
        BinaryOperator::Multiply => Value::Float(a * b),
        BinaryOperator::Divide => divide(a, b),
    }
}

fn divide(a: f64, b: f64) -> Value {
    if b == 0.0 {
        Value::Null
    } else {
        Value::Float(a / b)
    }
}

/// Row-wise [`apply`] over two columns of equal length.
pub fn evaluate(operator: BinaryOperator, left: &[Value], right: &[Value]) -> Vec<Value> {
    left.iter()
        .zip(right)
        .map(|(l, r)| apply(operator, l, r))
        .collect()
}
