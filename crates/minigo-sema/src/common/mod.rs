//! Common infrastructure shared across the analysis stages

mod diag;
mod span;

pub use diag::{Diagnostic, DiagnosticKind, DiagnosticReporter, Diagnostics};
pub use span::Span;
