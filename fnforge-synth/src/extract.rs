//! Pulling candidate code out of oracle replies

use std::fmt;

const FENCE: &str = "```";

/// Source text proposed by the oracle. Not yet parsed or validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    source: String,
    fenced: bool,
}

impl Candidate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fenced: false,
        }
    }

    fn from_block(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fenced: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the source came from a fenced block rather than the whole reply
    pub fn is_fenced(&self) -> bool {
        self.fenced
    }

    pub fn into_string(self) -> String {
        self.source
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Extract the first fenced code block of a reply.
///
/// A language tag directly after the opening fence is skipped. Without a
/// closed fence the whole reply is returned unchanged.
pub fn extract_code(response: &str) -> Candidate {
    match fenced_block(response) {
        Some(code) => Candidate::from_block(code),
        None => Candidate::new(response),
    }
}

fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find(FENCE)?;
    let mut body = &response[open + FENCE.len()..];

    let tag_len: usize = body
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum();
    if tag_len > 0 && body[tag_len..].starts_with(char::is_whitespace) {
        body = &body[tag_len..];
    }

    let close = body.find(FENCE)?;
    Some(body[..close].trim())
}
