//! Sandbox behavior through the public API

use fnforge_interpreter::{evaluate, InterpreterError, InterpreterOptions};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_deep_recursion_within_limit() {
    let source = "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); }";
    let result = evaluate(source, &json!(500), &InterpreterOptions::default()).unwrap();
    assert_eq!(result, json!(500));
}

#[test]
fn test_custom_recursion_limit() {
    let options = InterpreterOptions {
        max_recursion_depth: 10,
        ..InterpreterOptions::default()
    };
    let source = "function f(n) { return n === 0 ? 0 : 1 + f(n - 1); }";
    assert_eq!(
        evaluate(source, &json!(50), &options).unwrap_err(),
        InterpreterError::StackOverflow(10)
    );
}

#[test]
fn test_input_is_not_shared_between_runs() {
    let source = "function f(xs) { xs.push(1); return xs.length; }";
    let input = json!([]);
    let options = InterpreterOptions::default();
    assert_eq!(evaluate(source, &input, &options).unwrap(), json!(1));
    assert_eq!(evaluate(source, &input, &options).unwrap(), json!(1));
    assert_eq!(input, json!([]));
}

#[test]
fn test_cyclic_result_is_a_conversion_error() {
    let source = "function f(x) { const a = []; a.push(a); return a; }";
    assert!(matches!(
        evaluate(source, &json!(0), &InterpreterOptions::default()),
        Err(InterpreterError::Conversion(_))
    ));
}

#[test]
fn test_concurrent_evaluations() {
    let handles: Vec<_> = (0..4)
        .map(|n| {
            std::thread::spawn(move || {
                evaluate("return x * x", &json!(n), &InterpreterOptions::default()).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![json!(0), json!(1), json!(4), json!(9)]);
}
