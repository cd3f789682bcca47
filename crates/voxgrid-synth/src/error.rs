//! Compile and evaluation error types.

use thiserror::Error;

/// Result type alias for snippet compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Why a snippet could not be turned into a widget.
///
/// Every variant is recoverable: the dashboard surfaces it as a notification and
/// carries on with the widgets it already has.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("no entry point found: no top-level declaration name ends with `{suffix}`")]
    NoEntryPointFound { suffix: String },

    #[error("entry point `{name}` is not callable (found {found})")]
    EntryPointNotCallable { name: String, found: String },

    #[error("snippet evaluation threw: {0}")]
    EvaluationThrew(String),
}

/// Failure raised while parsing or running snippet code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("SyntaxError at {line}:{col}: {message}")]
    Syntax {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("evaluation budget of {0} steps exhausted")]
    BudgetExhausted(u64),

    #[error("maximum call depth of {0} exceeded")]
    DepthExceeded(usize),

    #[error("expressions nested deeper than {0} levels")]
    NestingExceeded(usize),

    #[error("Uncaught {0}")]
    Thrown(String),
}

impl From<EvalError> for CompileError {
    fn from(err: EvalError) -> Self {
        CompileError::EvaluationThrew(err.to_string())
    }
}
