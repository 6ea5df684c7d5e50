//! Semantic analysis for MiniGo, a statically-typed Go-subset language
//!
//! This library is the semantic-analysis stage of a MiniGo compiler front
//! end. It consumes an abstract syntax tree produced by the parser (literals
//! already typed, every node carrying a source span) and produces an ordered
//! list of diagnostics plus a fusion-legality classification for
//! floating-point multiply-add expressions. It performs no I/O and holds no
//! global state: every [`analyze`] call gets a fresh scope arena and
//! diagnostics sink, so independent programs can be analyzed concurrently.
//!
//! ## Architecture
//!
//! - **AST** (`ast/`): the node shapes consumed by this stage
//! - **Types** (`types/`): the closed MiniGo type set and the operator
//!   compatibility rules (exact match, no implicit numeric coercion)
//! - **Sema** (`sema/`): scope arena, the combined resolver/type-checker
//!   traversal, and the multiply-add fusion-legality pass
//! - **Common** (`common/`): shared infrastructure (spans, diagnostics)

pub mod ast;
pub mod common;
pub mod sema;
pub mod types;

// Re-exports for convenience
pub use common::{Diagnostic, DiagnosticKind, DiagnosticReporter, Span};
pub use sema::{Analysis, FusionSite, analyze};
pub use types::Type;
