//! Rule coverage and determinism of the purity analyzer

use fnforge_parser::parse_program;
use fnforge_purity::{analyze, ImpurityReason, PurityChecker, Verdict, NETWORK_PRIMITIVES};
use proptest::prelude::*;

#[test]
fn test_every_network_primitive_is_flagged() {
    for primitive in NETWORK_PRIMITIVES {
        let source = format!("{}('x')", primitive);
        assert!(
            matches!(analyze(&source), Verdict::Impure(ImpurityReason::NetworkAccess { .. })),
            "{} not flagged",
            primitive
        );
    }
}

#[test]
fn test_constructed_socket_is_side_effect() {
    assert!(matches!(
        analyze("new WebSocket('ws://host')"),
        Verdict::Impure(ImpurityReason::SideEffect { expression: "new expression", .. })
    ));
}

#[test]
fn test_update_expression_is_side_effect() {
    assert!(matches!(
        analyze("let n = 0\nn++"),
        Verdict::Impure(ImpurityReason::SideEffect { expression: "update expression", .. })
    ));
}

#[test]
fn test_declarations_and_returns_are_ignored() {
    let source = r#"
const table = [2, 3, 5, 7];
let seen = new Set(table);
function f(x) {
    return seen.has(x);
}
"#;
    assert_eq!(analyze(source), Verdict::Pure);
}

#[test]
fn test_checker_exposes_denylists() {
    let checker = PurityChecker::new();
    assert_eq!(checker.network_primitives().len(), 3);
    assert!(checker.os_primitives().iter().any(|p| p == "child_process"));
}

#[test]
fn test_check_statement_uses_entry_parameters() {
    let source = "function f(value) { return value }\nvalue = 1";
    let program = parse_program(source).unwrap();
    let checker = PurityChecker::new();
    let params = program.entry().param_names();

    assert_eq!(checker.check_statement(&program.items[0], source, &params), None);
    assert!(matches!(
        checker.check_statement(&program.items[1], source, &params),
        Some(ImpurityReason::InputModification { .. })
    ));
}

#[test]
fn test_first_offending_statement_wins() {
    let verdict = analyze("console.log(1)\nfetch('u')");
    assert!(matches!(
        verdict,
        Verdict::Impure(ImpurityReason::ConsoleAccess { .. })
    ));
}

proptest! {
    #[test]
    fn prop_analysis_is_deterministic(body in "[a-z(){};=+ 0-9\n]{0,40}") {
        prop_assert_eq!(analyze(&body), analyze(&body));
    }
}
