use std::cmp::Ordering;

use log::trace;

use super::{Flow, Interpreter};
use crate::ast::{InfixExpression, InfixOperator, PrefixExpression, PrefixOperator};
use crate::environment::Env;
use crate::object::Object;

impl Interpreter {
    pub(super) fn eval_prefix(&mut self, expr: &PrefixExpression, env: &Env) -> Flow {
        let right = self.eval_expression(&expr.right, env)?;

        prefix(expr.operator, &right).map_err(|msg| self.fail(msg, expr.position))
    }

    pub(super) fn eval_infix(&mut self, expr: &InfixExpression, env: &Env) -> Flow {
        let left = self.eval_expression(&expr.left, env)?;

        // `&&` and `||` only evaluate the right side when they must.
        match expr.operator {
            InfixOperator::And if !left.is_truthy() => return Ok(Object::Boolean(false)),
            InfixOperator::Or if left.is_truthy() => return Ok(Object::Boolean(true)),
            _ => {}
        }

        let right = self.eval_expression(&expr.right, env)?;

        trace!("Applying {} to {} and {}", expr.operator, left.type_tag(), right.type_tag());

        infix(expr.operator, &left, &right).map_err(|msg| self.fail(msg, expr.position))
    }
}

pub fn prefix(operator: PrefixOperator, right: &Object) -> Result<Object, String> {
    match (operator, right) {
        (PrefixOperator::Not, value) => Ok(Object::Boolean(!value.is_truthy())),

        (PrefixOperator::Negate, Object::Integer(n)) => n
            .checked_neg()
            .map(Object::Integer)
            .ok_or_else(|| format!("integer overflow in -{}", n)),

        (PrefixOperator::Negate, Object::Float(n)) => Ok(Object::Float(-n)),

        (PrefixOperator::Negate, other) => Err(format!(
            "unsupported operand type for -: {}",
            other.type_tag()
        )),
    }
}

pub fn infix(operator: InfixOperator, left: &Object, right: &Object) -> Result<Object, String> {
    use InfixOperator::*;

    let ordered = |accept: fn(Ordering) -> bool| {
        compare(operator, left, right).map(|ordering| Object::Boolean(ordering.is_some_and(accept)))
    };

    match operator {
        And => Ok(Object::Boolean(left.is_truthy() && right.is_truthy())),
        Or => Ok(Object::Boolean(left.is_truthy() || right.is_truthy())),

        Equal => Ok(Object::Boolean(left.equals(right))),
        NotEqual => Ok(Object::Boolean(!left.equals(right))),

        Less => ordered(Ordering::is_lt),
        Greater => ordered(Ordering::is_gt),
        LessEqual => ordered(Ordering::is_le),
        GreaterEqual => ordered(Ordering::is_ge),

        Add | Subtract | Multiply | Divide | FloorDivide | Remainder => arithmetic(operator, left, right),
    }
}

fn unsupported(operator: InfixOperator, left: &Object, right: &Object) -> String {
    format!(
        "unsupported operand types for {}: {} and {}",
        operator,
        left.type_tag(),
        right.type_tag()
    )
}

/// Numbers compare numerically, strings lexicographically; `None` when a
/// NaN is involved.
fn compare(operator: InfixOperator, left: &Object, right: &Object) -> Result<Option<Ordering>, String> {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => Ok(Some(a.cmp(b))),
        (Object::Integer(a), Object::Float(b)) => Ok((*a as f64).partial_cmp(b)),
        (Object::Float(a), Object::Integer(b)) => Ok(a.partial_cmp(&(*b as f64))),
        (Object::Float(a), Object::Float(b)) => Ok(a.partial_cmp(b)),
        (Object::Str(a), Object::Str(b)) => Ok(Some(a.cmp(b))),
        (l, r) => Err(unsupported(operator, l, r)),
    }
}

fn arithmetic(operator: InfixOperator, left: &Object, right: &Object) -> Result<Object, String> {
    match (left, right) {
        (Object::Integer(a), Object::Integer(b)) => integer_arithmetic(operator, *a, *b),

        (Object::Integer(a), Object::Float(b)) => Ok(float_arithmetic(operator, *a as f64, *b)),
        (Object::Float(a), Object::Integer(b)) => Ok(float_arithmetic(operator, *a, *b as f64)),
        (Object::Float(a), Object::Float(b)) => Ok(float_arithmetic(operator, *a, *b)),

        (Object::Str(a), Object::Str(b)) if operator == InfixOperator::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Object::string(joined))
        }

        (l, r) => Err(unsupported(operator, l, r)),
    }
}

/// `operator` is one of the arithmetic operators.
fn integer_arithmetic(operator: InfixOperator, a: i64, b: i64) -> Result<Object, String> {
    use InfixOperator::*;

    let overflow = || format!("integer overflow in {} {} {}", a, operator, b);

    let value = match operator {
        Add => a.checked_add(b).ok_or_else(overflow)?,
        Subtract => a.checked_sub(b).ok_or_else(overflow)?,
        Multiply => a.checked_mul(b).ok_or_else(overflow)?,

        Remainder if b == 0 => return Err("modulo by zero".to_string()),
        _ if b == 0 => return Err("division by zero".to_string()),

        // Truncates toward zero.
        Divide => a.checked_div(b).ok_or_else(overflow)?,

        FloorDivide => {
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                quotient - 1
            } else {
                quotient
            }
        }

        // Remainder; the sign follows the dividend.
        _ => a.checked_rem(b).ok_or_else(overflow)?,
    };

    Ok(Object::Integer(value))
}

/// `operator` is one of the arithmetic operators.
fn float_arithmetic(operator: InfixOperator, a: f64, b: f64) -> Object {
    use InfixOperator::*;

    let value = match operator {
        Add => a + b,
        Subtract => a - b,
        Multiply => a * b,
        Divide => a / b,
        FloorDivide => (a / b).floor(),
        _ => a % b,
    };

    Object::Float(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(op: InfixOperator, a: i64, b: i64) -> Result<Object, String> {
        infix(op, &Object::Integer(a), &Object::Integer(b))
    }

    #[test]
    fn integer_division_rules() {
        assert_eq!(int(InfixOperator::Divide, 10, 3), Ok(Object::Integer(3)));
        assert_eq!(int(InfixOperator::Divide, -7, 2), Ok(Object::Integer(-3)));
        assert_eq!(int(InfixOperator::FloorDivide, -7, 2), Ok(Object::Integer(-4)));
        assert_eq!(int(InfixOperator::Remainder, -7, 2), Ok(Object::Integer(-1)));
        assert_eq!(int(InfixOperator::Divide, 1, 0), Err("division by zero".to_string()));
    }

    #[test]
    fn overflow_is_reported() {
        assert!(int(InfixOperator::Add, i64::MAX, 1).is_err());
        assert!(int(InfixOperator::Divide, i64::MIN, -1).is_err());
        assert!(prefix(PrefixOperator::Negate, &Object::Integer(i64::MIN)).is_err());
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        assert_eq!(
            infix(InfixOperator::Add, &Object::Integer(1), &Object::Float(0.5)),
            Ok(Object::Float(1.5))
        );
        assert_eq!(
            infix(InfixOperator::Divide, &Object::Float(1.0), &Object::Integer(0)),
            Ok(Object::Float(f64::INFINITY))
        );
    }

    #[test]
    fn mismatched_types_are_unequal_not_errors() {
        assert_eq!(
            infix(InfixOperator::Equal, &Object::string("1"), &Object::Integer(1)),
            Ok(Object::Boolean(false))
        );
        assert!(infix(InfixOperator::Add, &Object::string("1"), &Object::Integer(1)).is_err());
    }
}
