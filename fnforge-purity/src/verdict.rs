//! Outcome of purity analysis

use std::fmt;

use fnforge_parser::ParseError;
use thiserror::Error;

/// Why a candidate was rejected. Each reason carries the source text of
/// the offending top-level statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImpurityReason {
    #[error("network access through `{callee}` in `{statement}`")]
    NetworkAccess { callee: String, statement: String },

    #[error("operating system access through `{callee}` in `{statement}`")]
    OsAccess { callee: String, statement: String },

    #[error("console access in `{statement}`")]
    ConsoleAccess { statement: String },

    #[error("top-level {expression} in `{statement}`")]
    SideEffect {
        expression: &'static str,
        statement: String,
    },

    #[error("access to variable `{name}` in `{statement}`")]
    VariableAccess { name: String, statement: String },

    #[error("assignment to parameter `{name}` in `{statement}`")]
    InputModification { name: String, statement: String },
}

impl ImpurityReason {
    /// Source text of the statement that triggered the rule
    pub fn statement(&self) -> &str {
        match self {
            ImpurityReason::NetworkAccess { statement, .. }
            | ImpurityReason::OsAccess { statement, .. }
            | ImpurityReason::ConsoleAccess { statement }
            | ImpurityReason::SideEffect { statement, .. }
            | ImpurityReason::VariableAccess { statement, .. }
            | ImpurityReason::InputModification { statement, .. } => statement,
        }
    }

    /// Stable short name of the rule
    pub fn rule(&self) -> &'static str {
        match self {
            ImpurityReason::NetworkAccess { .. } => "network-access",
            ImpurityReason::OsAccess { .. } => "os-access",
            ImpurityReason::ConsoleAccess { .. } => "console-access",
            ImpurityReason::SideEffect { .. } => "side-effect",
            ImpurityReason::VariableAccess { .. } => "variable-access",
            ImpurityReason::InputModification { .. } => "input-modification",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pure,
    Impure(ImpurityReason),
    ParseError(ParseError),
}

impl Verdict {
    pub fn is_pure(&self) -> bool {
        matches!(self, Verdict::Pure)
    }

    pub fn impurity(&self) -> Option<&ImpurityReason> {
        match self {
            Verdict::Impure(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pure => write!(f, "pure"),
            Verdict::Impure(reason) => write!(f, "impure: {}", reason),
            Verdict::ParseError(err) => write!(f, "parse error: {}", err),
        }
    }
}
