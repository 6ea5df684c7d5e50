//! Diagnostics: accumulated analysis errors and their rendering
//!
//! Semantic errors are never propagated as control flow. Each detection
//! appends a [`Diagnostic`] to the sink and analysis continues with the
//! offending expression downgraded to `Unknown`, so one pass can surface
//! every independent error in a program.

use codespan_reporting::diagnostic::{self, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use std::fmt;
use thiserror::Error;

use super::Span;

/// Classification of a semantic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Name redeclared within the same scope (shadowing an outer scope is
    /// legal and never reported).
    DuplicateDeclaration,
    /// Reference to a name with no reachable declaration.
    UndeclaredIdentifier,
    /// Operator applied to an operand-type pair outside the rule table where
    /// the operand categories otherwise line up (e.g. `int + float64`).
    TypeMismatch,
    /// Operator applied to operands of the wrong category entirely (e.g. a
    /// logical operator on non-bool operands).
    InvalidOperandType,
    /// `lhs = rhs` where the two sides have different types.
    AssignmentTypeMismatch,
    /// Indexing applied to a non-array value.
    NotIndexable,
    /// Array index that is not an `int`.
    InvalidIndexType,
    /// Call with the wrong number of arguments.
    ArgumentCountMismatch,
    /// Call argument whose type differs from the declared parameter type.
    ArgumentTypeMismatch,
    /// `if`/`for` condition that does not type to `bool`.
    NonBooleanCondition,
    /// `break` or `continue` outside of a loop.
    MisplacedControlFlow,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateDeclaration => "duplicate declaration",
            Self::UndeclaredIdentifier => "undeclared identifier",
            Self::TypeMismatch => "type mismatch",
            Self::InvalidOperandType => "invalid operand type",
            Self::AssignmentTypeMismatch => "assignment type mismatch",
            Self::NotIndexable => "not indexable",
            Self::InvalidIndexType => "invalid index type",
            Self::ArgumentCountMismatch => "argument count mismatch",
            Self::ArgumentTypeMismatch => "argument type mismatch",
            Self::NonBooleanCondition => "non-boolean condition",
            Self::MisplacedControlFlow => "misplaced control flow",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported analysis error. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

/// Ordered, append-only sink for analysis errors.
///
/// A fresh sink is created per `analyze` call and consumed with it; the
/// sink never crosses invocations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        self.entries.push(Diagnostic::new(kind, message, span));
    }

    /// Consume the sink, yielding diagnostics ordered by source position.
    ///
    /// The traversal emits mostly in source order already; the stable sort
    /// fixes up entries from the top-level pre-pass, which runs before any
    /// body is analyzed.
    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let mut entries = self.entries;
        entries.sort_by_key(|d| d.span.start);
        entries
    }
}

/// Diagnostic reporter for pretty error output against source text.
///
/// Consumers that still hold the original source can register it here and
/// render analysis errors with source excerpts and carets.
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report(&self, file_id: usize, diag: &Diagnostic) {
        let rendered = diagnostic::Diagnostic::error()
            .with_message(diag.kind.as_str())
            .with_labels(vec![
                Label::primary(file_id, diag.span.start..diag.span.end).with_message(&diag.message),
            ]);

        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &rendered);
    }

    pub fn report_all<'a>(&self, file_id: usize, diags: impl IntoIterator<Item = &'a Diagnostic>) {
        for diag in diags {
            self.report(file_id, diag);
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
