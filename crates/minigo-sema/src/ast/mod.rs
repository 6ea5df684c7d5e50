//! Abstract Syntax Tree definitions
//!
//! The shapes consumed by semantic analysis. The parser (an external
//! collaborator) produces these with literal values already typed and a
//! source span on every node; the analyzer attaches a resolved [`Type`]
//! to each expression but never re-validates syntax.
//!
//! [`Type`]: crate::types::Type

mod decl;
mod expr;
mod stmt;

pub use decl::*;
pub use expr::*;
pub use stmt::*;

/// A complete compilation unit (source file).
#[derive(Debug, Clone)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    pub fn new(decls: Vec<Decl>) -> Self {
        Self { decls }
    }
}
