//! Speech endpoints
//!
//! `/stt` accepts a multipart audio upload, transcribes it with whisper.cpp,
//! and removes the uploaded artifact afterwards. `/tts` synthesizes speech
//! with piper and persists the generated audio for audit.

use std::path::Path;
use std::time::Instant;

use axum::extract::{Json, Multipart, State};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use english_coach_speech::{ProsodyOptions, SpeechError};

use crate::state::AppState;
use crate::ServerError;

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    /// Transcribed text output
    pub text: String,
    /// Total time spent handling the request, in milliseconds
    pub duration_ms: f64,
}

/// Convert uploaded audio into text using whisper.cpp
pub async fn speech_to_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ServerError> {
    let start = Instant::now();

    let mut audio_bytes = None;
    let mut filename = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(String::from);
            audio_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::InvalidRequest(e.to_string()))?,
            );
            break;
        }
    }
    let audio_bytes =
        audio_bytes.ok_or_else(|| ServerError::InvalidRequest("missing file field".to_string()))?;

    let suffix = filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| ".wav".to_string());

    // Stored only for the duration of the transcription run.
    let temp_path = state.audio.save(&audio_bytes, &suffix)?;
    let result = state.stt.transcribe(&temp_path).await;
    if let Err(e) = std::fs::remove_file(&temp_path) {
        tracing::warn!(path = %temp_path.display(), "failed to remove uploaded audio: {e}");
    }
    let text = result?;

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(duration_ms, "transcription completed");
    Ok(Json(TranscriptionResponse { text, duration_ms }))
}

/// Text-to-speech request
#[derive(Debug, Deserialize)]
pub struct TextToSpeechRequest {
    /// Text to convert into speech audio
    pub text: String,
    /// Optional voice identifier for multi-speaker models
    #[serde(default)]
    pub voice: Option<String>,
    /// Prosody control: >1 slows speech down, <1 speeds it up
    #[serde(default)]
    pub length_scale: Option<f32>,
    /// Variation in speech energy; lower is calmer
    #[serde(default)]
    pub noise_scale: Option<f32>,
    /// Phoneme width variation; higher is more expressive
    #[serde(default)]
    pub noise_w: Option<f32>,
}

/// Text-to-speech response
#[derive(Debug, Serialize)]
pub struct TextToSpeechResponse {
    /// Base64 encoded WAV payload
    pub audio_base64: String,
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Total time spent generating the audio, in seconds
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_w: Option<f32>,
}

/// Convert text into speech audio using piper
pub async fn text_to_speech(
    State(state): State<AppState>,
    Json(request): Json<TextToSpeechRequest>,
) -> Result<Json<TextToSpeechResponse>, ServerError> {
    let start = Instant::now();

    let options = ProsodyOptions {
        voice: request.voice.clone(),
        length_scale: request.length_scale,
        noise_scale: request.noise_scale,
        noise_w: request.noise_w,
    };
    let synthesis = state.tts.synthesize(&request.text, &options).await?;

    // Persisted for audit; outlives the request.
    let audio_bytes = BASE64
        .decode(&synthesis.audio_base64)
        .map_err(|e| ServerError::Speech(SpeechError::Audio(e.to_string())))?;
    let stored = state.audio.save(&audio_bytes, ".wav")?;
    tracing::debug!(path = %stored.display(), "generated TTS audio stored");

    Ok(Json(TextToSpeechResponse {
        audio_base64: synthesis.audio_base64,
        sample_rate: synthesis.sample_rate,
        duration_seconds: start.elapsed().as_secs_f64(),
        voice: request.voice,
        length_scale: request.length_scale,
        noise_scale: request.noise_scale,
        noise_w: request.noise_w,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::create_router;
    use crate::testing::{stub_state, StubBackend};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_tts_returns_audio_and_persists_artifact() {
        let (state, dir) = stub_state(StubBackend::with_replies(&["unused"]));
        let request = Request::builder()
            .method("POST")
            .uri("/tts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"text": "Hello there"}).to_string()))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["sample_rate"], 22050);
        assert!(!body["audio_base64"].as_str().unwrap().is_empty());

        // Audit copy written into <data>/audio.
        let audio_dir = dir.path().join("audio");
        assert_eq!(std::fs::read_dir(audio_dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_stt_transcribes_multipart_upload() {
        let (state, dir) = stub_state(StubBackend::with_replies(&["unused"]));
        let boundary = "test-boundary";
        let payload = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"clip.wav\"\r\n\
             Content-Type: audio/wav\r\n\r\n\
             fake-audio-bytes\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/stt")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(payload))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let text = body["text"].as_str().unwrap();
        assert!(text.starts_with("[mock-transcription]"));
        assert!(body["duration_ms"].as_f64().unwrap() >= 0.0);

        // Uploaded artifact removed after transcription.
        let audio_dir = dir.path().join("audio");
        assert_eq!(std::fs::read_dir(audio_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_stt_rejects_missing_file_field() {
        let (state, _dir) = stub_state(StubBackend::with_replies(&["unused"]));
        let boundary = "test-boundary";
        let payload = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             value\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/stt")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(payload))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
