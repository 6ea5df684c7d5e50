//! Statement AST nodes

use super::decl::VarDecl;
use super::expr::{BinaryOp, Expr};
use crate::common::Span;

/// A `{ ... }` sequence of statements.
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

/// Statement node
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Statement kinds
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Variable declaration: `var x int = 5` or `x := 5`
    Var(VarDecl),

    /// Assignment: `x = e`, or compound `x += e` when `op` is set
    Assign {
        target: Expr,
        op: Option<BinaryOp>,
        value: Expr,
    },

    /// Bare expression statement (typically a call)
    Expr(Expr),

    /// `if cond { ... } else { ... }`; else-if chains nest in `else_block`
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },

    /// `for init; cond; post { ... }`; all three clauses optional
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },

    /// `return` with optional value
    Return(Option<Expr>),

    /// `break`
    Break,

    /// `continue`
    Continue,

    /// Bare block: `{ ... }`
    Block(Block),
}
