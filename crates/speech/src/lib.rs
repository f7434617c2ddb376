//! Speech services for the english-coach backend
//!
//! Wraps the external speech binaries as subprocesses:
//! - `SttEngine` — whisper.cpp speech-to-text
//! - `TtsEngine` — piper text-to-speech
//!
//! Both engines switch to deterministic mock output when their binary or
//! model is unavailable, so the rest of the pipeline stays testable on
//! machines without the speech runtimes. The audio store persists request
//! artifacts for audit.

pub mod audio;
pub mod stt;
pub mod tts;

pub use audio::AudioStore;
pub use stt::{SttConfig, SttEngine};
pub use tts::{ProsodyOptions, Synthesis, TtsConfig, TtsEngine};

use thiserror::Error;

/// Speech service errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("speech-to-text inference failed: {0}")]
    Stt(String),

    #[error("text-to-speech synthesis failed: {0}")]
    Tts(String),

    #[error("audio encoding error: {0}")]
    Audio(String),
}
