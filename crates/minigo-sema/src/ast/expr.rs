//! Expression AST nodes

use crate::common::Span;
use crate::types::Type;

/// Expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Resolved type of this expression (attached during semantic analysis).
    pub ty: Option<Type>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal: 42
    IntLit(i64),

    /// Floating-point literal: 3.14
    FloatLit(f64),

    /// String literal: "hello"
    StringLit(String),

    /// Boolean literal: true, false
    BoolLit(bool),

    /// Identifier reference: foo
    Ident(String),

    /// Binary operation: a + b, x < y, p && q
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation: -x, !flag, *ptr, &val
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Function call: add(a, b)
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Array subscript: arr[i]
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },

    /// Explicit type conversion: float64(x)
    ///
    /// Conversions are the only way to cross numeric types, and they are
    /// observable rounding boundaries for the fusion-legality analysis.
    Conversion {
        target: Type,
        operand: Box<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation: -x
    Neg,
    /// Logical not: !b
    Not,
    /// Pointer dereference: *p
    Deref,
    /// Address-of: &v
    AddrOf,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
            Self::Deref => "*",
            Self::AddrOf => "&",
        }
    }
}
