//! LLM integration
//!
//! Client for local OpenAI-compatible chat servers (LM Studio, Ollama's
//! compatibility endpoint, llama.cpp server) plus the constrained-generation
//! pipeline that keeps chat replies inside the classroom rules:
//! validate, retry with a corrective instruction, fall back deterministically.

pub mod backend;
pub mod constrained;

pub use backend::{ChatBackend, FrameStream, LlmClientConfig, OpenAiClient, DONE_FRAME};
pub use constrained::{
    retry_instruction, ConstrainedGenerator, ConstrainedOutcome, ConstrainedReply,
};

use thiserror::Error;

/// LLM errors
///
/// Only transport and provider failures exist here: a reply that merely
/// violates the response rules is not an error and is handled by the
/// constrained-generation pipeline instead.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Upstream returned a non-success status
    #[error("LLM request failed with status {status}")]
    Provider { status: u16, body: String },

    /// Network-level failure reaching the upstream server
    #[error("Network error: {0}")]
    Transport(String),

    /// Upstream body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}
