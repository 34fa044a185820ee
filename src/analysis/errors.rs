//! Analysis error types
//!
//! [`AnalysisError`] covers expressions the evaluator cannot make sense of.
//! None of them stop an analysis run: the statement that raised one is
//! reported and skipped, and a synthetic member assignment that raises one
//! is dropped.

use crate::parser::ast::SourceLocation;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Reference to a name with no visible declaration
    #[error("Undefined variable '{name}' at line {}", .location.line)]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// Assignment or increment whose target cannot be stored to
    #[error("Expression '{expr}' is not assignable at line {}", .location.line)]
    NotAnLvalue {
        expr: String,
        location: SourceLocation,
    },

    /// Member access naming a field the struct does not have
    #[error("'{ty}' has no member '{member}' at line {}", .location.line)]
    UnknownMember {
        ty: String,
        member: String,
        location: SourceLocation,
    },

    #[error("Type error at line {}: expected {expected}, got {got}", .location.line)]
    TypeError {
        expected: String,
        got: String,
        location: SourceLocation,
    },
}

impl AnalysisError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            AnalysisError::UndefinedVariable { location, .. }
            | AnalysisError::NotAnLvalue { location, .. }
            | AnalysisError::UnknownMember { location, .. }
            | AnalysisError::TypeError { location, .. } => location,
        }
    }
}
