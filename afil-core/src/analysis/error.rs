//! Analysis-error types (spec.md ยง7, axis 1): attributable to source, carrying a [`Span`].
//!
//! `PartialSyntaxError` is the internal currency returned by leaf analyser helpers that don't yet
//! know the span to blame -- the caller that does know the relevant span converts it to a
//! [`SyntaxError`] by attaching one. This two-tier split (mirrored from the original
//! implementation's `PartialSyntaxError`/`SyntaxError` pair) avoids threading a `Span` parameter
//! through every helper that can only fail in a handful of its branches.

use crate::id::{FunctionId, TypeId};
use crate::span::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(String),
    #[error("expected type `{expected}`, found `{found}`")]
    TypeMismatch { expected: String, found: String },
    #[error("call to `{0}` is ambiguous")]
    AmbiguousOverload(String),
    #[error("no viable overload for `{0}`")]
    NoViableOverload(String),
    #[error("concept not satisfied for template `{0}`")]
    ConceptNotSatisfied(String),
    #[error("array size must be a non-negative constant integer")]
    ArraySizeNotConstant,
    #[error("a constant expression is required here")]
    NotAConstantExpression,
    #[error("recursive type `{0}` without a pointer indirection")]
    RecursiveTypeWithoutIndirection(String),
    #[error("designated initializer mentions member `{0}` more than once")]
    DuplicateDesignatedInitializerMember(String),
    #[error("`{struct_name}` has no member named `{member}`")]
    UnknownDesignatedInitializerMember { struct_name: String, member: String },
    #[error("could not deduce template arguments for `{0}`")]
    TemplateDeductionFailed(String),
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,
    #[error("`continue` outside of a loop")]
    ContinueOutsideLoop,
    #[error("namespace `{0}` not found")]
    NamespaceNotFound(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}")]
pub struct PartialSyntaxError {
    pub kind: ErrorKind,
}

impl PartialSyntaxError {
    pub fn new(kind: ErrorKind) -> Self {
        PartialSyntaxError { kind }
    }

    pub fn with_span(self, span: Span) -> SyntaxError {
        SyntaxError { kind: self.kind, span }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} at {span:?}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        SyntaxError { kind, span }
    }
}

/// A `FunctionId` bundled with the zero-based index of the precondition that failed to hold, the
/// single runtime fault kind (spec.md ยง7, axis 2). Not an "error" in the diagnosable sense: no
/// span, no message, just enough to let the caller report which call site broke a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmetPrecondition {
    pub function_id: FunctionId,
    pub precondition_index: u32,
}

/// Raised internally when a dependent-type resolution could not find or build the type it was
/// asked for; carries the best-effort `TypeId` context for error messages higher up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolutionError {
    pub error: PartialSyntaxError,
    pub in_progress_type: Option<TypeId>,
}
