//! Chat message and completion types
//!
//! Mirrors the OpenAI chat-completions vocabulary so request bodies round-trip
//! unchanged between the app frontend, this backend, and the local LLM server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Completion request
///
/// Optional fields are omitted from the wire body entirely when absent; the
/// local servers this backend targets reject explicit nulls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Conversation messages in chronological order
    pub messages: Vec<Message>,
    /// Model override (falls back to the client's configured default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a request from an ordered message list
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Set the model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token cap
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Completion reply: extracted text plus the full decoded provider body.
///
/// The raw body is passthrough metadata — accessors read it defensively and
/// never assume the provider populated any field.
#[derive(Debug, Clone)]
pub struct Completion {
    /// First choice's message content (empty when the provider sent none)
    pub text: String,
    /// Full decoded response body
    pub raw: Value,
}

impl Completion {
    /// Wrap an extracted reply and its raw provider body
    pub fn new(text: impl Into<String>, raw: Value) -> Self {
        Self {
            text: text.into(),
            raw,
        }
    }

    /// Model name reported by the provider
    pub fn model(&self) -> Option<&str> {
        self.raw.get("model").and_then(Value::as_str)
    }

    /// Finish reason of the first choice
    pub fn finish_reason(&self) -> Option<&str> {
        self.raw
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("finish_reason"))
            .and_then(Value::as_str)
    }

    /// Prompt token count from the usage block
    pub fn prompt_tokens(&self) -> Option<u64> {
        self.usage_field("prompt_tokens")
    }

    /// Completion token count from the usage block
    pub fn completion_tokens(&self) -> Option<u64> {
        self.usage_field("completion_tokens")
    }

    /// Total token count from the usage block
    pub fn total_tokens(&self) -> Option<u64> {
        self.usage_field("total_tokens")
    }

    fn usage_field(&self, key: &str) -> Option<u64> {
        self.raw
            .get("usage")
            .and_then(|u| u.get(key))
            .and_then(Value::as_u64)
    }
}

/// Prepend the configured system prompt unless the conversation already
/// carries one. A conversation handed to the LLM client starts with at most
/// one system message; retries must never duplicate it.
pub fn ensure_system_prompt(messages: &[Message], prompt: &str) -> Vec<Message> {
    if prompt.is_empty() || messages.iter().any(|m| m.role == Role::System) {
        return messages.to_vec();
    }
    let mut prepared = Vec::with_capacity(messages.len() + 1);
    prepared.push(Message::system(prompt));
    prepared.extend_from_slice(messages);
    prepared
}
