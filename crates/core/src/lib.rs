//! Core types for the english-coach backend
//!
//! Shared vocabulary used by every other crate:
//! - Chat messages and roles (OpenAI-compatible)
//! - Completion requests and the provider reply wrapper

pub mod chat;

pub use chat::{ensure_system_prompt, Completion, CompletionRequest, Message, Role};
