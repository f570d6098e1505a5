//! Sandboxed interpreter for candidate programs
//!
//! Candidates get a pure builtin library and nothing else: no I/O, no
//! timers, no randomness. Every run is bounded by a step budget, a call
//! depth limit and an optional wall-clock timeout, none of which candidate
//! code can catch.

pub mod builtins;
pub mod convert;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod isolate;
pub mod value;

#[cfg(test)]
mod interpreter_tests;

pub use convert::{deep_equal, from_json, to_json};
pub use environment::Environment;
pub use error::{InterpreterError, InterpreterResult};
pub use interpreter::{Interpreter, InterpreterOptions, DEFAULT_STACK_SIZE};
pub use isolate::run_isolated;
pub use value::Value;

use fnforge_core::ast::Program;

/// Apply a parsed program's entry function to a JSON input on an isolated
/// thread, with a fresh interpreter
pub fn evaluate_program(
    program: &Program,
    input: &serde_json::Value,
    options: &InterpreterOptions,
) -> InterpreterResult<serde_json::Value> {
    run_isolated(options.stack_size, || {
        let mut interpreter = Interpreter::new(options.clone());
        let result = interpreter.call_entry(program, from_json(input))?;
        to_json(&result)
    })?
}

/// Parse `source` and evaluate it on `input`
pub fn evaluate(
    source: &str,
    input: &serde_json::Value,
    options: &InterpreterOptions,
) -> InterpreterResult<serde_json::Value> {
    let program = fnforge_parser::parse_program(source)?;
    evaluate_program(&program, input, options)
}

/// Evaluate and compare the result with `expected` structurally
pub fn matches_expected(
    program: &Program,
    input: &serde_json::Value,
    expected: &serde_json::Value,
    options: &InterpreterOptions,
) -> InterpreterResult<(bool, serde_json::Value)> {
    run_isolated(options.stack_size, || {
        let mut interpreter = Interpreter::new(options.clone());
        let result = interpreter.call_entry(program, from_json(input))?;
        let equal = deep_equal(&result, &from_json(expected));
        Ok((equal, to_json(&result)?))
    })?
}
