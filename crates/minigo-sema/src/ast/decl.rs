//! Declaration AST nodes

use super::expr::Expr;
use super::stmt::Block;
use crate::common::Span;
use crate::types::Type;

/// Top-level declaration
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

impl Decl {
    pub fn new(kind: DeclKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Declaration kinds
#[derive(Debug, Clone)]
pub enum DeclKind {
    Var(VarDecl),
    Func(FuncDecl),
}

/// A single variable binding.
///
/// `var x int = e` carries both a declared type and an initializer;
/// `var x int` only the type; `x := e` (and `var x = e`) only the
/// initializer, from which the variable's type is taken.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub declared_ty: Option<Type>,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// Function declaration
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Declared result type; `Type::Unit` when the function returns nothing.
    pub result: Type,
    pub body: Block,
    pub span: Span,
}
