//! Chat backend trait and the OpenAI-compatible client
//!
//! Talks to a local chat-completions server over HTTP. The streaming variant
//! re-emits upstream server-sent-event payloads; once the first frame has
//! been produced, any failure is encoded as an in-band error frame followed
//! by the `[DONE]` sentinel so the consumer's event channel always terminates
//! cleanly.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};

use english_coach_core::{Completion, CompletionRequest};

use crate::LlmError;

/// Terminal sentinel payload closing every event stream
pub const DONE_FRAME: &str = "[DONE]";

/// Stream of SSE frame payloads (the text after `data: `).
///
/// Infallible by construction: upstream failures arrive as an in-band
/// `{"error": …}` payload followed by [`DONE_FRAME`].
pub type FrameStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Chat backend interface
///
/// Implemented by [`OpenAiClient`] for real servers and by test stubs for the
/// constrained-generation tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Execute a standard (non-streaming) chat completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Stream chat completion frames from the upstream server
    fn complete_stream(&self, request: &CompletionRequest) -> FrameStream;
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Base URL of the OpenAI-compatible server, e.g. `http://127.0.0.1:1234/v1`
    pub base_url: String,
    /// Model used when a request does not name one
    pub default_model: Option<String>,
    /// Timeout for non-streaming requests; streaming requests are bounded by
    /// the upstream stream lifetime instead
    pub request_timeout: Duration,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1234/v1".to_string(),
            default_model: None,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Client for OpenAI-compatible chat endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    config: LlmClientConfig,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(mut config: LlmClientConfig) -> Result<Self, LlmError> {
        while config.base_url.ends_with('/') {
            config.base_url.pop();
        }
        let http = Client::builder()
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Build the request body, including only the fields that were supplied
    fn wire_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut body = json!({ "messages": &request.messages });
        let model = request
            .model
            .as_deref()
            .or(self.config.default_model.as_deref());
        if let Some(model) = model {
            body["model"] = Value::from(model);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = Value::from(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = Value::from(max_tokens);
        }
        if stream {
            body["stream"] = Value::from(true);
        }
        body
    }
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let url = self.completions_url();
        let body = self.wire_body(request, false);
        tracing::debug!(%url, "sending chat completion request");

        let response = self
            .http
            .post(&url)
            .timeout(self.config.request_timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "LLM returned error response");
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let text = extract_content(&raw);
        Ok(Completion::new(text, raw))
    }

    fn complete_stream(&self, request: &CompletionRequest) -> FrameStream {
        let http = self.http.clone();
        let url = self.completions_url();
        let body = self.wire_body(request, true);

        Box::pin(async_stream::stream! {
            let response = match http.post(&url).json(&body).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("LLM streaming request failed: {e}");
                    yield error_frame(&e.to_string());
                    yield DONE_FRAME.to_string();
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(500).collect();
                tracing::error!(status = %status, body = %snippet, "LLM streaming request failed");
                yield error_frame(if snippet.is_empty() { status.as_str() } else { &snippet });
                yield DONE_FRAME.to_string();
                return;
            }

            let mut buffer = String::new();
            let mut bytes = response.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].to_string();
                            buffer.drain(..=pos);
                            if let Some(payload) = frame_payload(&line) {
                                yield payload;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("LLM stream interrupted: {e}");
                        yield error_frame(&e.to_string());
                        yield DONE_FRAME.to_string();
                        return;
                    }
                }
            }
            if let Some(payload) = frame_payload(&buffer) {
                yield payload;
            }
        })
    }
}

/// First choice's message content; empty string when absent
fn extract_content(raw: &Value) -> String {
    raw.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Extract the payload of one upstream SSE line. Lines already carrying a
/// `data:` prefix are unwrapped; other non-empty lines pass through whole.
fn frame_payload(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
    Some(payload.to_string())
}

/// In-band error payload for a failed stream
fn error_frame(message: &str) -> String {
    json!({ "error": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use english_coach_core::Message;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new(LlmClientConfig::default()).unwrap()
    }

    #[test]
    fn test_wire_body_omits_absent_fields() {
        let request = CompletionRequest::new(vec![Message::user("hi")]);
        let body = client().wire_body(&request, false);
        assert!(body.get("model").is_none());
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn test_wire_body_includes_supplied_fields() {
        let request = CompletionRequest::new(vec![Message::user("hi")])
            .with_model("qwen2.5")
            .with_temperature(0.0)
            .with_max_tokens(32);
        let body = client().wire_body(&request, true);
        assert_eq!(body["model"], "qwen2.5");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 32);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_wire_body_falls_back_to_default_model() {
        let config = LlmClientConfig {
            default_model: Some("default-model".to_string()),
            ..Default::default()
        };
        let client = OpenAiClient::new(config).unwrap();
        let request = CompletionRequest::new(vec![Message::user("hi")]);
        assert_eq!(client.wire_body(&request, false)["model"], "default-model");

        let request = request.with_model("override");
        assert_eq!(client.wire_body(&request, false)["model"], "override");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = LlmClientConfig {
            base_url: "http://localhost:1234/v1/".to_string(),
            ..Default::default()
        };
        let client = OpenAiClient::new(config).unwrap();
        assert_eq!(
            client.completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_extract_content() {
        let raw = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(extract_content(&raw), "hello");
        assert_eq!(extract_content(&json!({})), "");
        assert_eq!(extract_content(&json!({"choices": []})), "");
    }

    #[test]
    fn test_frame_payload() {
        assert_eq!(frame_payload("data: {\"a\":1}").as_deref(), Some("{\"a\":1}"));
        assert_eq!(frame_payload("data: [DONE]").as_deref(), Some("[DONE]"));
        assert_eq!(frame_payload("{\"a\":1}").as_deref(), Some("{\"a\":1}"));
        assert_eq!(frame_payload("   "), None);
    }
}
