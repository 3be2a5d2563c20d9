//! Error types for QuailBASIC compilation.
//!
//! Lowering distinguishes two failure families:
//!
//! - [`SemanticError`]: the program is wrong. Carries an error kind, the
//!   offending source excerpt, and a human-readable reason. Lowering
//!   aborts at the first semantic error; there is no recovery within a
//!   compilation.
//! - [`InternalError`]: the compiler is wrong (an unexpected tree shape,
//!   an impossible type in a typed dispatch, a misconfigured runtime
//!   feature). These indicate bugs, not user mistakes.
//!
//! [`CompileError`] is the union the public entry points return.

use thiserror::Error;

/// The kind of a semantic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Incompatible mixing of string and numeric operands.
    DataTypeMismatch,
    /// Writing to a UDF, or using a UDF where storage is required.
    BadAssignment,
    /// Wrong entity kind for an argument (expected variable/array).
    BadArgument,
    /// Subscripts applied to a scalar variable.
    ScalarVariableCannotBeIndexed,
    /// UDF called with the wrong number of arguments.
    InsufficientUdfArgs,
    /// FOR still open at end of program.
    ForWithoutNext,
    /// NEXT with no matching FOR.
    NextWithoutFor,
    /// WHILE still open at end of program.
    WhileWithoutWend,
    /// WEND with no matching WHILE.
    WendWithoutWhile,
    /// ELSE BEGIN with no matching IF THEN BEGIN.
    MismatchedElseBegin,
    /// END IF with no matching IF THEN BEGIN.
    MismatchedEndIf,
    /// Use of an array or string target before DIM/LET.
    NotDefined,
}

/// A semantic error raised during lowering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("[{kind:?}] {reason}: `{snippet}`")]
pub struct SemanticError {
    /// What rule was violated.
    pub kind: ErrorKind,
    /// The offending source excerpt.
    pub snippet: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl SemanticError {
    /// Creates a semantic error.
    pub fn new(kind: ErrorKind, snippet: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            snippet: snippet.into(),
            reason: reason.into(),
        }
    }
}

/// An internal-consistency violation: a compiler bug, not a user error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("internal compiler error: {0}")]
pub struct InternalError(pub String);

impl InternalError {
    /// Creates an internal error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Any error a compilation can end with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The program violates a language rule.
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    /// The compiler violated its own invariants.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CompileError {
    /// The semantic error kind, if this is a semantic error.
    pub fn semantic_kind(&self) -> Option<ErrorKind> {
        match self {
            CompileError::Semantic(e) => Some(e.kind),
            CompileError::Internal(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_error_display() {
        let err = SemanticError::new(
            ErrorKind::DataTypeMismatch,
            "A$ + 1",
            "STRING does not mix with INTEGER",
        );
        let text = err.to_string();
        assert!(text.contains("DataTypeMismatch"));
        assert!(text.contains("A$ + 1"));
    }

    #[test]
    fn test_compile_error_kind() {
        let err: CompileError =
            SemanticError::new(ErrorKind::NextWithoutFor, "NEXT I", "NEXT without FOR").into();
        assert_eq!(err.semantic_kind(), Some(ErrorKind::NextWithoutFor));

        let err: CompileError = InternalError::new("missing binding").into();
        assert_eq!(err.semantic_kind(), None);
    }
}
