//! HTTP endpoints
//!
//! REST API for the language-learning backend.

use axum::routing::{get, post};
use axum::{response::IntoResponse, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{chat, lookup, speech};
use crate::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat proxy
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/chat/stream/raw", post(chat::chat_stream_raw))
        // Lookup tasks
        .route("/translate", post(lookup::translate))
        .route("/grammar", post(lookup::grammar_check))
        .route("/dictionary", post(lookup::dictionary_lookup))
        // Speech
        .route("/stt", post(speech::speech_to_text))
        .route("/tts", post(speech::text_to_speech))
        // Health check
        .route("/health", get(health_check))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
