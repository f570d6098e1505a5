//! The synthesize, validate and correct loop

use fnforge_core::ast::Program;
use fnforge_interpreter::{evaluate_program, InterpreterOptions, InterpreterResult};
use fnforge_parser::ParseError;
use fnforge_purity::{ImpurityReason, PurityChecker, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

use crate::error::{Result, SynthError};
use crate::executor::{run_test_cases, TestCase, TestFailure};
use crate::extract::{extract_code, Candidate};
use crate::oracle::{Conversation, Message, Oracle};
use crate::prompt::build_prompt;

/// Iterations used when a request does not say
pub const DEFAULT_ITERATIONS: u32 = 3;

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// What to synthesize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    pub description: String,
    pub test_cases: Vec<TestCase>,
    /// Oracle calls allowed; each rejected candidate uses one
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

impl SynthesisRequest {
    pub fn new(description: impl Into<String>, test_cases: Vec<TestCase>, iterations: u32) -> Self {
        Self {
            description: description.into(),
            test_cases,
            iterations,
        }
    }
}

/// Loop states, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Requesting,
    Extracting,
    Validating,
    Testing,
    Succeeded,
    Retrying,
    Exhausted,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Requesting => "requesting",
            LoopState::Extracting => "extracting",
            LoopState::Validating => "validating",
            LoopState::Testing => "testing",
            LoopState::Succeeded => "succeeded",
            LoopState::Retrying => "retrying",
            LoopState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// A validated function: pure by the purity rules and passing every
/// example it was synthesized from. Each call runs in a fresh interpreter.
#[derive(Debug, Clone)]
pub struct SynthesizedFunction {
    source: Arc<str>,
    program: Arc<Program>,
    options: InterpreterOptions,
}

impl SynthesizedFunction {
    pub(crate) fn new(source: String, program: Program, options: InterpreterOptions) -> Self {
        Self {
            source: source.into(),
            program: Arc::new(program),
            options,
        }
    }

    /// Candidate source as the oracle wrote it
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Apply the function. `undefined` and non-finite numbers come back as
    /// `null`.
    pub fn call(&self, input: &serde_json::Value) -> InterpreterResult<serde_json::Value> {
        evaluate_program(&self.program, input, &self.options)
    }
}

/// Why a candidate was sent back
enum Rejection {
    Unparseable(ParseError),
    Impure(ImpurityReason),
    Failing(Vec<TestFailure>),
}

/// Drives an oracle until it produces a validated function
pub struct Synthesizer {
    oracle: Arc<dyn Oracle>,
    checker: PurityChecker,
    options: InterpreterOptions,
}

impl Synthesizer {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            checker: PurityChecker::new(),
            options: InterpreterOptions::default(),
        }
    }

    /// Limits applied when running candidates
    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the loop for one request.
    ///
    /// Every oracle reply consumes one iteration. Oracle errors end the
    /// run immediately; rejected candidates are answered with a corrective
    /// message until the budget is spent.
    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedFunction> {
        let span = info_span!(
            "synthesize",
            iterations = request.iterations,
            cases = request.test_cases.len()
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: SynthesisRequest) -> Result<SynthesizedFunction> {
        let prompt = build_prompt(&request.description, &request.test_cases)?;
        let mut conversation = Conversation::new(prompt);

        let mut remaining = request.iterations;
        while remaining > 0 {
            let iteration = request.iterations - remaining + 1;
            debug!(iteration, state = %LoopState::Requesting);
            let reply = self.oracle.complete(&conversation).await?;
            conversation.push(reply.clone());

            debug!(iteration, state = %LoopState::Extracting);
            let candidate = extract_code(&reply.content);

            match self.validate(iteration, &candidate, &request.test_cases) {
                Ok(program) => {
                    info!(iteration, state = %LoopState::Succeeded, "function synthesized");
                    return Ok(SynthesizedFunction::new(
                        candidate.into_string(),
                        program,
                        self.options.clone(),
                    ));
                }
                Err(rejection) => {
                    remaining -= 1;
                    debug!(iteration, remaining, state = %LoopState::Retrying);
                    conversation.push(Message::requester(correction(
                        &reply.content,
                        &candidate,
                        &rejection,
                    )));
                }
            }
        }

        info!(
            iterations = request.iterations,
            state = %LoopState::Exhausted,
            "synthesis failed"
        );
        Err(SynthError::Exhausted {
            iterations: request.iterations,
            transcript: conversation,
        })
    }

    fn validate(
        &self,
        iteration: u32,
        candidate: &Candidate,
        cases: &[TestCase],
    ) -> std::result::Result<Program, Rejection> {
        debug!(iteration, state = %LoopState::Validating);
        let program = match fnforge_parser::parse_program(candidate.as_str()) {
            Ok(program) => program,
            Err(e) => {
                debug!(iteration, verdict = %Verdict::ParseError(e.clone()));
                return Err(Rejection::Unparseable(e));
            }
        };

        let verdict = self.checker.check(&program, candidate.as_str());
        debug!(iteration, %verdict);
        if let Verdict::Impure(reason) = verdict {
            return Err(Rejection::Impure(reason));
        }

        debug!(iteration, state = %LoopState::Testing);
        let failures = run_test_cases(&program, cases, &self.options);
        if failures.is_empty() {
            Ok(program)
        } else {
            debug!(iteration, failures = failures.len(), "candidate failed examples");
            Err(Rejection::Failing(failures))
        }
    }
}

/// Corrective message sent back after a rejected candidate
fn correction(response: &str, candidate: &Candidate, rejection: &Rejection) -> String {
    match rejection {
        Rejection::Unparseable(e) if candidate.is_fenced() => format!(
            "the code you wrote does not parse, fix it and answer with the whole function in backticks:\n\n{}\n\n({})",
            candidate, e
        ),
        Rejection::Unparseable(e) => format!(
            "no code wrapped in backticks was found: {}\n\n({})",
            response, e
        ),
        Rejection::Impure(reason) => format!(
            "the code you wrote has a side effect {}, extract just the function without side effects, in backticks\n\n({})",
            response, reason
        ),
        Rejection::Failing(failures) => {
            let failures: Vec<String> = failures.iter().map(ToString::to_string).collect();
            format!(
                "Help me fix this function:\n\n{}\n\nfor the following test cases:\n\n{}",
                candidate,
                failures.join("\n\n")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request(iterations: u32) -> SynthesisRequest {
        SynthesisRequest::new(
            "double the input",
            vec![TestCase::new(json!(1), json!(2)), TestCase::new(json!(5), json!(10))],
            iterations,
        )
    }

    fn synthesizer(responses: &[&str]) -> (Arc<ScriptedOracle>, Synthesizer) {
        let oracle = Arc::new(ScriptedOracle::new(responses.iter().copied()));
        let synthesizer = Synthesizer::new(oracle.clone());
        (oracle, synthesizer)
    }

    fn transcript(result: Result<SynthesizedFunction>) -> Conversation {
        match result {
            Err(SynthError::Exhausted { transcript, .. }) => transcript,
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_first_candidate_accepted() {
        let (oracle, synthesizer) = synthesizer(&["```js\nconst f = x => x * 2\n```"]);
        let function = synthesizer.synthesize(request(3)).await.unwrap();

        assert_eq!(oracle.calls(), 1);
        assert_eq!(function.source(), "const f = x => x * 2");
        assert_eq!(function.call(&json!(21)).unwrap(), json!(42));
    }

    #[tokio::test]
    async fn test_zero_iterations_never_calls_oracle() {
        let (oracle, synthesizer) = synthesizer(&["```\nconst f = x => x * 2\n```"]);
        let conversation = transcript(synthesizer.synthesize(request(0)).await);
        assert_eq!(oracle.calls(), 0);
        assert_eq!(conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_budget_counts_oracle_calls() {
        let (oracle, synthesizer) = synthesizer(&["```x => x```", "```x => x```", "```x => x```"]);
        let conversation = transcript(synthesizer.synthesize(request(2)).await);
        assert_eq!(oracle.calls(), 2);
        assert_eq!(conversation.messages().len(), 5);
        assert_eq!(conversation.oracle_turns(), 2);
    }

    #[tokio::test]
    async fn test_test_failure_correction() {
        let (oracle, synthesizer) = synthesizer(&[
            "```\nfunction f(x) { return x + 1 }\n```",
            "```\nfunction f(x) { return x * 2 }\n```",
        ]);
        let function = synthesizer.synthesize(request(2)).await.unwrap();
        assert_eq!(oracle.calls(), 2);
        assert_eq!(function.source(), "function f(x) { return x * 2 }");
    }

    #[tokio::test]
    async fn test_correction_messages() {
        let (_, synthesizer) = synthesizer(&[
            "I cannot do that {",
            "```\nconsole.log(x)\nfunction f(x) { return x * 2 }\n```",
            "```\nfunction f(x) { return x + 1 }\n```",
        ]);
        let conversation = transcript(synthesizer.synthesize(request(3)).await);
        let messages = conversation.messages();
        assert_eq!(messages.len(), 7);

        assert!(messages[2]
            .content
            .starts_with("no code wrapped in backticks was found: I cannot do that {"));
        assert!(messages[4].content.starts_with("the code you wrote has a side effect ```"));
        assert!(messages[4].content.contains("console access"));
        assert_eq!(
            messages[6].content,
            "Help me fix this function:\n\nfunction f(x) { return x + 1 }\n\n\
             for the following test cases:\n\n\
             input: 5\n\nValues are not equal.\nexpected: 10\nactual: 6"
        );
    }

    #[tokio::test]
    async fn test_fenced_parse_error_correction() {
        let (oracle, retrying) = synthesizer(&[
            "Here:\n```js\nfunction f(x) { return x *\n```",
            "```js\nfunction f(x) { return x * 2 }\n```",
        ]);
        let function = retrying.synthesize(request(2)).await.unwrap();
        assert_eq!(oracle.calls(), 2);
        assert_eq!(function.source(), "function f(x) { return x * 2 }");

        let (_, single) = synthesizer(&["```\nfunction f(x) { return x *\n```"]);
        let conversation = transcript(single.synthesize(request(1)).await);
        let correction = &conversation.messages()[2].content;
        assert!(correction.starts_with(
            "the code you wrote does not parse, fix it and answer with the whole function in backticks:\n\nfunction f(x) { return x *\n\n("
        ));
        assert!(!correction.contains("no code wrapped in backticks"));
    }

    #[tokio::test]
    async fn test_oracle_error_is_fatal() {
        let (oracle, synthesizer) = synthesizer(&[]);
        let result = synthesizer.synthesize(request(3)).await;
        assert!(matches!(result, Err(SynthError::Oracle(_))));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_prompt_too_long_before_any_call() {
        let (oracle, synthesizer) = synthesizer(&["```x```"]);
        let request = SynthesisRequest::new("d".repeat(3000), vec![], 3);
        assert!(matches!(
            synthesizer.synthesize(request).await,
            Err(SynthError::PromptTooLong { .. })
        ));
        assert_eq!(oracle.calls(), 0);
    }

    #[test]
    fn test_request_wire_format() {
        let request: SynthesisRequest = serde_json::from_value(json!({
            "description": "determine if prime",
            "testCases": [[1, false], [2, true]]
        }))
        .unwrap();
        assert_eq!(request.iterations, DEFAULT_ITERATIONS);
        assert_eq!(request.test_cases[1], TestCase::new(json!(2), json!(true)));
    }
}
