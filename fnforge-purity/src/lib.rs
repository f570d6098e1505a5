//! Purity analysis for candidate functions
//!
//! A candidate is rejected when one of its top-level statements calls a
//! network or OS primitive, writes to the console, evaluates an expression
//! for its effect, reads a bare variable, or reassigns the entry function's
//! parameter.

pub mod checker;
pub mod verdict;

pub use checker::{PurityChecker, CONSOLE_OBJECT, NETWORK_PRIMITIVES, OS_PRIMITIVES};
pub use verdict::{ImpurityReason, Verdict};

use tracing::debug;

/// Parse and check a candidate with the default rules
pub fn analyze(source: &str) -> Verdict {
    match fnforge_parser::parse_program(source) {
        Ok(program) => PurityChecker::new().check(&program, source),
        Err(err) => {
            debug!(error = %err, "candidate does not parse");
            Verdict::ParseError(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reason(source: &str) -> ImpurityReason {
        match analyze(source) {
            Verdict::Impure(reason) => reason,
            other => panic!("expected impure verdict for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_pure_function() {
        let source = "function f(x) {\n  return x * 2;\n}";
        assert_eq!(analyze(source), Verdict::Pure);
    }

    #[test]
    fn test_console_log_is_impure() {
        assert_eq!(
            reason("console.log(x)"),
            ImpurityReason::ConsoleAccess {
                statement: "console.log(x)".to_string()
            }
        );
    }

    #[test]
    fn test_network_call() {
        assert_eq!(
            reason("fetch('https://example.com')\nfunction f(x) { return x }"),
            ImpurityReason::NetworkAccess {
                callee: "fetch".to_string(),
                statement: "fetch('https://example.com')".to_string()
            }
        );
    }

    #[test]
    fn test_os_call() {
        assert!(matches!(
            reason("const f = x => x; require('fs');"),
            ImpurityReason::OsAccess { ref callee, .. } if callee == "require"
        ));
    }

    #[test]
    fn test_parameter_assignment() {
        assert_eq!(
            reason("x = 3\nreturn x"),
            ImpurityReason::InputModification {
                name: "x".to_string(),
                statement: "x = 3".to_string()
            }
        );
    }

    #[test]
    fn test_assignment_to_non_parameter_is_side_effect() {
        assert!(matches!(
            reason("function f(n) { return n }\ncounter = 1;"),
            ImpurityReason::SideEffect { expression: "assignment", .. }
        ));
    }

    #[test]
    fn test_bare_identifier() {
        assert!(matches!(
            reason("secret\nfunction f(x) { return x }"),
            ImpurityReason::VariableAccess { ref name, .. } if name == "secret"
        ));
        assert_eq!(analyze("undefined\nfunction f(x) { return x }"), Verdict::Pure);
    }

    #[test]
    fn test_literal_and_plain_call_are_pure() {
        assert_eq!(analyze("'use strict'\nhelper(1)\nfunction f(x) { return x }"), Verdict::Pure);
    }

    #[test]
    fn test_nested_effects_are_not_detected() {
        let source = "function f(x) { console.log(x); return x }";
        assert_eq!(analyze(source), Verdict::Pure);
    }

    #[test]
    fn test_parse_error_verdict() {
        assert!(matches!(analyze("function f(x) {"), Verdict::ParseError(_)));
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Pure.to_string(), "pure");
        let verdict = analyze("console.error('boom')");
        assert_eq!(
            verdict.to_string(),
            "impure: console access in `console.error('boom')`"
        );
    }
}
