//! Operator compatibility rules
//!
//! A finite dispatch table keyed by (operator, left type, right type).
//! Exact type match is required everywhere; any combination not listed
//! falls through to a single reject branch. `Unknown` operands short
//! circuit to `Unknown` so error recovery never compounds diagnostics.

use super::Type;
use crate::ast::{BinaryOp, UnaryOp};

/// Why an operand combination was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    /// Operand categories line up but the types differ
    /// (e.g. `int + float64`, `int == string`).
    Mismatch,
    /// An operand category is wrong for the operator entirely
    /// (e.g. `&&` on numbers, `-` on a string).
    InvalidOperand,
}

/// Result type of a binary operation, or why it is rejected.
pub fn binary_result(op: BinaryOp, left: &Type, right: &Type) -> Result<Type, RuleViolation> {
    if left.is_unknown() || right.is_unknown() {
        return Ok(Type::Unknown);
    }

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            match (left, right) {
                (Type::Int, Type::Int) => Ok(Type::Int),
                (Type::Float64, Type::Float64) => Ok(Type::Float64),
                // String concatenation is `+` only.
                (Type::String, Type::String) if op == BinaryOp::Add => Ok(Type::String),
                _ if arithmetic_operand(op, left) && arithmetic_operand(op, right) => {
                    Err(RuleViolation::Mismatch)
                }
                _ => Err(RuleViolation::InvalidOperand),
            }
        }
        BinaryOp::Mod => match (left, right) {
            (Type::Int, Type::Int) => Ok(Type::Int),
            _ if left.is_numeric() && right.is_numeric() => Err(RuleViolation::Mismatch),
            _ => Err(RuleViolation::InvalidOperand),
        },
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => match (left, right) {
            (Type::Int, Type::Int) | (Type::Float64, Type::Float64) => Ok(Type::Bool),
            _ if left.is_numeric() && right.is_numeric() => Err(RuleViolation::Mismatch),
            _ => Err(RuleViolation::InvalidOperand),
        },
        BinaryOp::Eq | BinaryOp::Ne => {
            if left == right {
                Ok(Type::Bool)
            } else {
                Err(RuleViolation::Mismatch)
            }
        }
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Type::Bool, Type::Bool) => Ok(Type::Bool),
            _ => Err(RuleViolation::InvalidOperand),
        },
    }
}

/// Result type of a unary operation, or why it is rejected.
pub fn unary_result(op: UnaryOp, operand: &Type) -> Result<Type, RuleViolation> {
    if operand.is_unknown() {
        return Ok(Type::Unknown);
    }

    match op {
        UnaryOp::Neg => {
            if operand.is_numeric() {
                Ok(operand.clone())
            } else {
                Err(RuleViolation::InvalidOperand)
            }
        }
        UnaryOp::Not => match operand {
            Type::Bool => Ok(Type::Bool),
            _ => Err(RuleViolation::InvalidOperand),
        },
        UnaryOp::Deref => match operand {
            Type::Pointer(elem) => Ok((**elem).clone()),
            _ => Err(RuleViolation::InvalidOperand),
        },
        UnaryOp::AddrOf => Ok(Type::pointer(operand.clone())),
    }
}

/// Whether a type belongs to the operand category of an arithmetic
/// operator (strings count only for `+`).
fn arithmetic_operand(op: BinaryOp, ty: &Type) -> bool {
    ty.is_numeric() || (op == BinaryOp::Add && *ty == Type::String)
}
