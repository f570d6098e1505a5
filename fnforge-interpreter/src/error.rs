//! Error types for the interpreter

use std::fmt;
use std::time::Duration;

use fnforge_parser::ParseError;
use thiserror::Error;

use crate::value::Value;

/// Result type for interpreter operations
pub type InterpreterResult<T> = Result<T, InterpreterError>;

/// Errors that end a run. Exceptions thrown by the candidate that nobody
/// catches surface as `Uncaught` with their rendered text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpreterError {
    /// Candidate threw and did not catch
    #[error("Uncaught {0}")]
    Uncaught(String),

    /// Step budget spent
    #[error("Step limit exceeded: more than {0} steps")]
    StepLimitExceeded(u64),

    /// Too many nested calls
    #[error("Stack overflow: maximum recursion depth {0} exceeded")]
    StackOverflow(usize),

    /// Wall-clock budget spent
    #[error("Evaluation timeout after {0:?}")]
    Timeout(Duration),

    /// The program does not expose a callable entry
    #[error("Entry error: {0}")]
    InvalidEntry(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Values could not be converted to or from JSON
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The isolated execution thread failed
    #[error("Execution thread failed: {0}")]
    Isolate(String),

    #[error("Break outside of loop")]
    BreakOutsideLoop,

    #[error("Continue outside of loop")]
    ContinueOutsideLoop,
}

impl InterpreterError {
    /// Resource limits are enforced regardless of candidate try/catch
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            InterpreterError::StepLimitExceeded(_)
                | InterpreterError::StackOverflow(_)
                | InterpreterError::Timeout(_)
        )
    }
}

/// Binding failures reported by the environment
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Identifier '{0}' has already been declared")]
    AlreadyDeclared(String),

    #[error("Assignment to constant variable '{0}'")]
    ConstAssignment(String),

    #[error("{0} is not defined")]
    Undefined(String),
}

/// Completion of a statement
#[derive(Debug, Clone)]
pub enum ControlFlow {
    Normal,
    Break(Option<String>),
    Continue(Option<String>),
    Return(Value),
}

impl fmt::Display for ControlFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFlow::Normal => write!(f, "normal"),
            ControlFlow::Break(None) => write!(f, "break"),
            ControlFlow::Break(Some(label)) => write!(f, "break {}", label),
            ControlFlow::Continue(None) => write!(f, "continue"),
            ControlFlow::Continue(Some(label)) => write!(f, "continue {}", label),
            ControlFlow::Return(_) => write!(f, "return"),
        }
    }
}

/// Abrupt completion inside the evaluator: either a catchable candidate
/// exception or a run-ending error
#[derive(Debug, Clone)]
pub enum Abrupt {
    Throw(Value),
    Error(InterpreterError),
}

impl From<InterpreterError> for Abrupt {
    fn from(err: InterpreterError) -> Self {
        Abrupt::Error(err)
    }
}

pub type EvalResult<T> = Result<T, Abrupt>;

/// Throw a fresh error object of the given class
pub fn throw<T>(name: &str, message: impl AsRef<str>) -> EvalResult<T> {
    Err(Abrupt::Throw(Value::error(name, message.as_ref())))
}

pub fn type_error<T>(message: impl AsRef<str>) -> EvalResult<T> {
    throw("TypeError", message)
}

pub fn range_error<T>(message: impl AsRef<str>) -> EvalResult<T> {
    throw("RangeError", message)
}

pub fn reference_error<T>(message: impl AsRef<str>) -> EvalResult<T> {
    throw("ReferenceError", message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InterpreterError::Uncaught("TypeError: x is not a function".to_string());
        assert_eq!(err.to_string(), "Uncaught TypeError: x is not a function");

        let err = InterpreterError::StackOverflow(512);
        assert_eq!(
            err.to_string(),
            "Stack overflow: maximum recursion depth 512 exceeded"
        );
    }

    #[test]
    fn test_limits() {
        assert!(InterpreterError::StepLimitExceeded(10).is_limit());
        assert!(!InterpreterError::Uncaught("x".into()).is_limit());
    }

    #[test]
    fn test_throw_builds_error_object() {
        match type_error::<()>("bad") {
            Err(Abrupt::Throw(value)) => assert_eq!(value.to_js_string(), "TypeError: bad"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_binding_error_display() {
        assert_eq!(
            BindingError::Undefined("y".into()).to_string(),
            "y is not defined"
        );
    }
}
