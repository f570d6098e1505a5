//! Running candidates against the requested examples

use fnforge_core::ast::Program;
use fnforge_interpreter::{matches_expected, InterpreterOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// One input/output example. Serialized as `[input, expected]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(Value, Value)", into = "(Value, Value)")]
pub struct TestCase {
    pub input: Value,
    pub expected: Value,
}

impl TestCase {
    pub fn new(input: Value, expected: Value) -> Self {
        Self { input, expected }
    }
}

impl From<(Value, Value)> for TestCase {
    fn from((input, expected): (Value, Value)) -> Self {
        Self::new(input, expected)
    }
}

impl From<TestCase> for (Value, Value) {
    fn from(case: TestCase) -> Self {
        (case.input, case.expected)
    }
}

/// What went wrong for a failing case
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// The function returned something else
    Mismatch { actual: Value },
    /// The function threw, hit a limit or produced an unconvertible value
    Fault { description: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    pub index: usize,
    pub input: Value,
    pub expected: Value,
    pub outcome: FailureOutcome,
}

impl fmt::Display for TestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            FailureOutcome::Mismatch { actual } => write!(
                f,
                "input: {}\n\nValues are not equal.\nexpected: {}\nactual: {}",
                self.input, self.expected, actual
            ),
            FailureOutcome::Fault { description } => write!(
                f,
                "Threw an exception for input {}. Here's the stack trace: {}",
                self.input, description
            ),
        }
    }
}

/// Run every case, collecting failures in case order
pub fn run_test_cases(
    program: &Program,
    cases: &[TestCase],
    options: &InterpreterOptions,
) -> Vec<TestFailure> {
    cases
        .iter()
        .enumerate()
        .filter_map(|(index, case)| {
            let outcome = match matches_expected(program, &case.input, &case.expected, options) {
                Ok((true, _)) => {
                    debug!(index, "case passed");
                    return None;
                }
                Ok((false, actual)) => FailureOutcome::Mismatch { actual },
                Err(e) => FailureOutcome::Fault {
                    description: e.to_string(),
                },
            };
            debug!(index, ?outcome, "case failed");
            Some(TestFailure {
                index,
                input: case.input.clone(),
                expected: case.expected.clone(),
                outcome,
            })
        })
        .collect()
}
