//! Parse errors: spans plus a message, following the same two-axis split `afil-core` uses for
//! analysis errors (a span is always known by the time a parse error is raised, so there's no
//! partial/complete split here).

use afil_core::span::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("unrecognised token at {span:?}")]
    InvalidToken { span: Span },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },
    #[error("expected {expected}, found {found} at {span:?}")]
    UnexpectedToken { expected: String, found: String, span: Span },
}
