//! Compiler-facing error types (§7).
//!
//! Two independent error families exist on purpose. [`ParseError`] and
//! [`SemanticError`] (wrapped together by [`CompileError`]) describe why
//! *compilation* failed and are ordinary [`Result`] errors. [`ExecStatus`]
//! is not an error type at all — it is the two-valued control-flow status
//! (`ES::SUCCESS` / `ES::FAILURE`) the *emitted* CHR program returns by
//! value at runtime (§6.3, §7 item 4). Conflating the two would force every
//! rule firing through the `Result` machinery meant for compiler failures;
//! keep them apart.

use crate::position::Position;
use thiserror::Error;

/// Malformed surface syntax, illegal pragma placement, or a missing include
/// (§7 item 1).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{position}: unexpected token `{found}`, expected {expected}")]
    UnexpectedToken {
        position: Position,
        found: String,
        expected: String,
    },

    #[error("{position}: reserved keyword `{keyword}` cannot be used as an identifier")]
    ReservedKeyword { position: Position, keyword: String },

    #[error("{position}: pragma `{pragma}` is not legal on {context}")]
    IllegalPragma {
        position: Position,
        pragma: String,
        context: String,
    },

    #[error("{position}: constraint `{name}` called with {found} argument(s), declared with {expected}")]
    ArityMismatch {
        position: Position,
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("{position}: include file `{path}` not found")]
    IncludeNotFound { position: Position, path: String },

    /// Wraps a parse error that originated inside an included file. Per §9's
    /// open question, only one level of wrapping is modeled — no full
    /// include stack.
    #[error("{site}: in included file: {inner}")]
    Included {
        site: Position,
        inner: Box<ParseError>,
    },

    #[error("{position}: unterminated `<chr>` block")]
    UnterminatedChrBlock { position: Position },
}

/// Violations caught after parsing, during semantic analysis (§7 item 2).
#[derive(Debug, Error)]
pub enum SemanticError {
    #[error("{position}: undeclared CHR constraint `{name}` in rule head")]
    UndeclaredConstraint { position: Position, name: String },

    #[error("{position}: CHR constraint `{name}` declared more than once (first at {first})")]
    DuplicateDeclaration {
        position: Position,
        name: String,
        first: Position,
    },

    #[error("{position}: CHR constraint call `{name}` is not allowed in this context")]
    ChrCallInExpressionContext { position: Position, name: String },

    #[error("{position}: unification `%=` is not allowed in this context")]
    UnificationInExpressionContext { position: Position },

    #[error("{position}: variable `{name}` is free in the body but never bound by the head, an enclosing behavior/try, or unification")]
    UnboundVariable { position: Position, name: String },
}

/// Top-level compile error, wrapping every source of compile failure plus
/// I/O, exactly as the teacher's top error enum wraps its storage layer's.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Config(String),
}

impl From<std::io::Error> for CompileError {
    fn from(e: std::io::Error) -> Self {
        CompileError::Io(e.to_string())
    }
}

/// Runtime control-flow status returned by every emitted matching step
/// (§6.3, §7). Not an error type: `Failure` is an ordinary outcome of a
/// CHR `failure` keyword or a guard that never holds, propagated by value
/// through `,`-sequences and caught at the nearest `;`-choice, `try`, or
/// behavior alternative (§4.4.5, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    Success,
    Failure,
}

impl ExecStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ExecStatus::Success)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ExecStatus::Failure)
    }

    /// `,`-sequence combinator: the first failure short-circuits (§4.4.5).
    pub fn and_then(self, next: impl FnOnce() -> ExecStatus) -> ExecStatus {
        match self {
            ExecStatus::Success => next(),
            ExecStatus::Failure => ExecStatus::Failure,
        }
    }
}

/// A non-fatal diagnostic emitted during analysis (§4.1.2, §7 item 3).
/// Warnings never abort compilation and never change the exit code.
#[derive(Debug, Clone)]
pub struct Warning {
    pub position: Position,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: warning: {}", self.position, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_status_and_then_short_circuits_on_failure() {
        let mut calls = 0;
        let result = ExecStatus::Failure.and_then(|| {
            calls += 1;
            ExecStatus::Success
        });
        assert_eq!(result, ExecStatus::Failure);
        assert_eq!(calls, 0);
    }

    #[test]
    fn compile_error_wraps_parse_error() {
        let parse_err = ParseError::UnterminatedChrBlock {
            position: Position::synthetic(),
        };
        let compile_err: CompileError = parse_err.into();
        assert!(matches!(compile_err, CompileError::Parse(_)));
    }
}
