//! english-coach server
//!
//! HTTP surface for the language-learning backend: chat proxying with
//! constrained generation, translation, grammar checking, dictionary lookup,
//! and the speech endpoints.

pub mod http;
pub mod routes;
pub mod state;

pub use http::create_router;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use english_coach_llm::LlmError;
use english_coach_speech::SpeechError;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Llm(LlmError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Llm(_) => StatusCode::BAD_GATEWAY,
            ServerError::Speech(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, "request failed: {self}");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
