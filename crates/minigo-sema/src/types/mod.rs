//! The MiniGo type system
//!
//! A closed set of types compared by structural equality. There is no
//! subtyping and no implicit conversion between distinct variants; mixing
//! `int` and `float64` requires an explicit conversion in the source.

mod rules;

pub use rules::{RuleViolation, binary_result, unary_result};

use std::fmt;

/// A MiniGo type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Float64,
    String,
    Bool,
    /// Array with element type. Length is not part of the type.
    Array(Box<Type>),
    /// Pointer to a value of the element type.
    Pointer(Box<Type>),
    /// Function type: ordered parameter types and a result type
    /// (`Unit` for functions that return nothing).
    Func {
        params: Vec<Type>,
        result: Box<Type>,
    },
    /// The "no value" marker for functions without a result.
    Unit,
    /// Error sentinel. Produced when an expression could not be typed;
    /// treated as compatible with everything so a single malformed
    /// subexpression does not cascade into dependent false errors.
    Unknown,
}

impl Type {
    pub fn array(elem: Type) -> Self {
        Self::Array(Box::new(elem))
    }

    pub fn pointer(elem: Type) -> Self {
        Self::Pointer(Box::new(elem))
    }

    pub fn func(params: Vec<Type>, result: Type) -> Self {
        Self::Func {
            params,
            result: Box::new(result),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float64)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Float64 => f.write_str("float64"),
            Self::String => f.write_str("string"),
            Self::Bool => f.write_str("bool"),
            Self::Array(elem) => write!(f, "[]{elem}"),
            Self::Pointer(elem) => write!(f, "*{elem}"),
            Self::Func { params, result } => {
                f.write_str("func(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{param}")?;
                }
                f.write_str(")")?;
                if **result != Self::Unit {
                    write!(f, " {result}")?;
                }
                Ok(())
            }
            Self::Unit => f.write_str("void"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}
