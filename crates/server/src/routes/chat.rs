//! Chat endpoints
//!
//! `/chat` proxies the conversation through the constrained-generation
//! pipeline. `/chat/stream` runs the same pipeline to completion and emits
//! the finished reply as a single SSE frame, for interface uniformity with
//! true streaming clients. `/chat/stream/raw` forwards upstream deltas
//! unmodified for consumers that want incremental delivery without the
//! response rules.

use std::convert::Infallible;

use axum::extract::{Json, State};
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

use english_coach_core::{ensure_system_prompt, Completion, CompletionRequest, Message};
use english_coach_llm::DONE_FRAME;

use crate::state::AppState;
use crate::ServerError;

/// Chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages in order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Model name; uses the server default when omitted
    #[serde(default)]
    pub model: Option<String>,
    /// Sampling temperature forwarded to the LLM
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Max tokens for the completion
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply content
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl ChatResponse {
    fn from_completion(completion: &Completion) -> Self {
        Self {
            content: completion.text.clone(),
            model: completion.model().map(String::from),
            finish_reason: completion.finish_reason().map(String::from),
            prompt_tokens: completion.prompt_tokens(),
            completion_tokens: completion.completion_tokens(),
            total_tokens: completion.total_tokens(),
        }
    }
}

fn completion_request(state: &AppState, request: ChatRequest) -> CompletionRequest {
    let prepared = ensure_system_prompt(&request.messages, &state.settings.llm.system_prompt);
    CompletionRequest {
        messages: prepared,
        model: request.model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

/// Proxy chat to the local OpenAI-compatible LLM server, enforcing the
/// response rules
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let request = completion_request(&state, request);
    let reply = state.chat.generate(&request).await?;
    Ok(Json(ChatResponse::from_completion(&reply.completion)))
}

/// Stream the constrained chat reply via server-sent events.
///
/// The full pipeline runs before the first byte is sent; the finished reply
/// is emitted as exactly one content frame followed by the `[DONE]` sentinel.
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let request = completion_request(&state, request);
    let reply = state.chat.generate(&request).await?;

    let model = reply.completion.model().map(String::from);
    let payload = json!({
        "choices": [{"delta": {"content": reply.completion.text}}],
        "model": model,
    });
    let frames = vec![
        Ok(Event::default().data(payload.to_string())),
        Ok(Event::default().data(DONE_FRAME)),
    ];
    Ok(Sse::new(futures::stream::iter(frames)))
}

/// Proxy the upstream token stream as-is, without response rules.
///
/// Upstream failures arrive as an in-band error frame followed by `[DONE]`;
/// client disconnects simply drop the stream.
pub async fn chat_stream_raw(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request = completion_request(&state, request);
    let frames = state
        .llm
        .complete_stream(&request)
        .map(|payload| Ok(Event::default().data(payload)));
    Sse::new(frames)
}
