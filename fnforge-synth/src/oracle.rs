//! Conversations with the language model
//!
//! The loop only relies on the `Oracle` contract: given the conversation
//! so far, produce the next message. `CachedOracle` puts a `MemoCache` in
//! front of any oracle so replayed conversations never reach the network.

use async_trait::async_trait;
use fnforge_cache::MemoCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::OracleError;

/// Author of a message. Serialized with the chat wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Requester,
    #[serde(rename = "assistant")]
    Oracle,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Requester => write!(f, "user"),
            Role::Oracle => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn requester(content: impl Into<String>) -> Self {
        Self {
            role: Role::Requester,
            content: content.into(),
        }
    }

    pub fn oracle(content: impl Into<String>) -> Self {
        Self {
            role: Role::Oracle,
            content: content.into(),
        }
    }
}

/// Append-only message history, always opened by a requester message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::requester(prompt)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message
    pub fn last(&self) -> &Message {
        // never empty: `new` seeds the prompt and nothing removes messages
        &self.messages[self.messages.len() - 1]
    }

    /// Number of oracle replies so far
    pub fn oracle_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Oracle)
            .count()
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", message.role)?;
            writeln!(f, "{}", message.content)?;
        }
        Ok(())
    }
}

/// Chat request as sent on the wire. Also the source of cache keys.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// A language model producing the next message of a conversation
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Reply to the conversation
    async fn complete(&self, conversation: &Conversation) -> Result<Message, OracleError>;

    /// Model name sent with requests
    fn model(&self) -> &str;

    /// Sampling temperature, when the oracle sets one
    fn temperature(&self) -> Option<f32> {
        None
    }

    /// Wire request for a conversation
    fn request<'a>(&'a self, conversation: &'a Conversation) -> ChatRequest<'a> {
        ChatRequest {
            model: self.model(),
            messages: conversation.messages(),
            temperature: self.temperature(),
        }
    }
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for Arc<O> {
    async fn complete(&self, conversation: &Conversation) -> Result<Message, OracleError> {
        (**self).complete(conversation).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }

    fn temperature(&self) -> Option<f32> {
        (**self).temperature()
    }
}

/// Memoizes an oracle by the canonical form of its wire request
pub struct CachedOracle<O> {
    inner: O,
    cache: Arc<MemoCache>,
}

impl<O: Oracle> CachedOracle<O> {
    pub fn new(inner: O, cache: Arc<MemoCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<MemoCache> {
        &self.cache
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

#[async_trait]
impl<O: Oracle> Oracle for CachedOracle<O> {
    async fn complete(&self, conversation: &Conversation) -> Result<Message, OracleError> {
        let request = self.inner.request(conversation);
        debug!(
            namespace = self.cache.namespace(),
            messages = conversation.messages().len(),
            "cached oracle request"
        );
        self.cache
            .get_or_compute(&request, || self.inner.complete(conversation))
            .await
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn temperature(&self) -> Option<f32> {
        self.inner.temperature()
    }
}

/// Replays a fixed list of replies in order
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `complete` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, _conversation: &Conversation) -> Result<Message, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .get(call)
            .map(|content| Message::oracle(content.clone()))
            .ok_or(OracleError::ScriptExhausted(call))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
