//! Error types for synthesis

use std::path::PathBuf;
use thiserror::Error;

use crate::oracle::Conversation;

/// Failures talking to the language model
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("No API key configured; set OPENAI_API_KEY or oracle.api_key")]
    MissingApiKey,

    #[error("Cache error: {0}")]
    Cache(#[from] fnforge_cache::CacheError),

    /// A scripted oracle ran out of responses
    #[error("No scripted response left after {0} calls")]
    ScriptExhausted(usize),
}

/// Failures loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Reasons synthesis stops without a function
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Prompt is too long: {length} characters exceeds the limit of {max}")]
    PromptTooLong { length: usize, max: usize },

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// The iteration budget ran out; the transcript holds every exchange
    #[error("Failed generating code after {iterations} iterations")]
    Exhausted {
        iterations: u32,
        transcript: Conversation,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
