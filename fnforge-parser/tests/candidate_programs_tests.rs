//! Parsing whole candidate programs the way an oracle tends to write them

use fnforge_core::ast::{Entry, Stmt};
use fnforge_parser::{parse_program, ErrorKind};

#[test]
fn test_prime_checker() {
    let source = r#"
function isPrime(n) {
    if (n < 2) return false;
    for (let i = 2; i * i <= n; i++) {
        if (n % i === 0) {
            return false;
        }
    }
    return true;
}
"#;
    let program = parse_program(source).unwrap();
    assert_eq!(program.items.len(), 1);
    match program.entry() {
        Entry::Function { name, function } => {
            assert_eq!(name, "isPrime");
            assert_eq!(function.param_names(), vec!["n".to_string()]);
        }
        other => panic!("unexpected entry {:?}", other),
    }
}

#[test]
fn test_helper_plus_entry() {
    let source = r#"
const memo = {};
function fib(n) {
    if (n in memo) return memo[n];
    return memo[n] = n < 2 ? n : fib(n - 1) + fib(n - 2);
}
function f(x) { return fib(x) }
"#;
    let program = parse_program(source).unwrap();
    assert_eq!(program.items.len(), 3);
    assert!(matches!(program.entry(), Entry::Function { ref name, .. } if name == "f"));
}

#[test]
fn test_bare_body_uses_implicit_parameter() {
    let program = parse_program("const words = x.split(' ')\nreturn words.length").unwrap();
    assert_eq!(program.entry(), Entry::Body);
    assert!(matches!(program.items[1].stmt, Stmt::Return(Some(_))));
}

#[test]
fn test_higher_order_chains() {
    let source = "const f = xs => xs.filter(v => v % 2 === 0).map((v, i) => ({ v, i })).length;";
    let program = parse_program(source).unwrap();
    assert!(matches!(program.entry(), Entry::Function { .. }));
}

#[test]
fn test_string_processing() {
    let source = r#"
function f(s) {
    let out = '';
    for (const ch of s) {
        out = ch + out;
    }
    return `${out}!`;
}
"#;
    assert!(parse_program(source).is_ok());
}

#[test]
fn test_prose_is_rejected() {
    let err = parse_program("Here is the function you asked for:").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedToken);
}

#[test]
fn test_unknown_character_is_rejected() {
    let err = parse_program("function f(x) { return x # 2 }").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);
}
