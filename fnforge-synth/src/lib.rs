//! Function synthesis from descriptions and examples
//!
//! A language model proposes candidates; each is checked by the purity
//! rules and run against the examples in the sandboxed interpreter. Rejected
//! candidates are answered with a corrective message until one passes or
//! the iteration budget runs out.

pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod openai;
pub mod oracle;
pub mod prompt;
pub mod synthesizer;

pub use config::{load_config, SynthConfig};
pub use error::{ConfigError, OracleError, Result, SynthError};
pub use executor::{run_test_cases, FailureOutcome, TestCase, TestFailure};
pub use extract::{extract_code, Candidate};
pub use openai::OpenAiOracle;
pub use oracle::{CachedOracle, ChatRequest, Conversation, Message, Oracle, Role, ScriptedOracle};
pub use prompt::{build_prompt, MAX_PROMPT_LENGTH, PROMPT_PREFIX};
pub use synthesizer::{
    LoopState, SynthesisRequest, SynthesizedFunction, Synthesizer, DEFAULT_ITERATIONS,
};
