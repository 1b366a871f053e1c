//! Tree-walking evaluation.
//!
//! The reference semantics the bytecode has to reproduce. Operands of an
//! addition are evaluated left first, the same order the compiler emits them in.
use crate::{
    expression::Expression,
    scope::{Environment, UnboundReference},
    Integer,
};

/// Evaluates `expression` with `environment` supplying the free names.
///
/// Only the taken arm of a condition is evaluated, so an unbound reference in
/// the other arm goes unnoticed here (the compiler still rejects it).
pub fn evaluate(
    expression: &Expression,
    environment: &Environment<'_>,
) -> Result<Integer, UnboundReference> {
    match expression {
        Expression::Literal(value) => Ok(*value),
        Expression::Addition { left, right } => {
            let left = evaluate(left, environment)?;
            let right = evaluate(right, environment)?;
            Ok(left.wrapping_add(right))
        }
        Expression::Definition { name, value, body } => {
            let value = evaluate(value, environment)?;
            evaluate(body, &environment.bind(name, value))
        }
        Expression::Reference(name) => environment.lookup(name),
        Expression::Condition { test, yes, no } => {
            if evaluate(test, environment)? != 0 {
                evaluate(yes, environment)
            } else {
                evaluate(no, environment)
            }
        }
    }
}
