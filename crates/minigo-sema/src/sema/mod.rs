//! Semantic analysis
//!
//! Scope resolution, type checking and the multiply-add fusion-legality
//! pass over a parsed program. [`analyze`] is the library boundary: AST
//! in, ordered diagnostics and fusion classifications out.

mod analyzer;
mod fusion;
mod scope;

pub use analyzer::Analyzer;
pub use fusion::FusionSite;
pub use scope::{ScopeId, ScopeKind, ScopeStack, Symbol, SymbolKind};

use crate::ast::Program;
use crate::common::Diagnostic;

/// The result of analyzing one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Analysis errors, ordered by source position. Empty for a valid
    /// program.
    pub diagnostics: Vec<Diagnostic>,
    /// Fusion-legality classification of every float multiply-add site.
    pub fusion: Vec<FusionSite>,
}

impl Analysis {
    /// True iff the program passed semantic analysis. By policy any
    /// non-empty diagnostic list blocks code generation.
    pub fn is_valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Analyze one compilation unit.
///
/// Resolves every identifier, computes and attaches the static type of
/// every expression, and classifies multiply-add fusion legality. Each
/// call creates its own scope arena and diagnostics sink, so independent
/// programs may be analyzed concurrently with no coordination.
pub fn analyze(program: &mut Program) -> Analysis {
    let mut analyzer = Analyzer::new();
    analyzer.analyze_program(program);
    let diagnostics = analyzer.into_diagnostics().into_sorted();
    let fusion = fusion::classify(program);
    Analysis { diagnostics, fusion }
}
