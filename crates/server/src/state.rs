//! Application state
//!
//! Service clients are constructed once at startup and shared across request
//! handlers through `Arc`s. They hold fixed configuration only, so cloning
//! the state per request is cheap and lock-free.

use std::sync::Arc;
use std::time::Duration;

use english_coach_config::Settings;
use english_coach_llm::{
    ChatBackend, ConstrainedGenerator, LlmClientConfig, OpenAiClient,
};
use english_coach_speech::{AudioStore, SttConfig, SttEngine, TtsConfig, TtsEngine};

use crate::ServerError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub settings: Arc<Settings>,
    /// Chat backend used directly by the lookup endpoints
    pub llm: Arc<dyn ChatBackend>,
    /// Constrained-generation pipeline used by the chat endpoints
    pub chat: ConstrainedGenerator,
    /// Speech-to-text engine
    pub stt: Arc<SttEngine>,
    /// Text-to-speech engine
    pub tts: Arc<TtsEngine>,
    /// Audit store for audio artifacts
    pub audio: AudioStore,
}

impl AppState {
    /// Build the state with real service clients from settings
    pub fn new(settings: Settings) -> Result<Self, ServerError> {
        let llm: Arc<dyn ChatBackend> = Arc::new(OpenAiClient::new(LlmClientConfig {
            base_url: settings.llm.base_url.clone(),
            default_model: settings.llm.default_model.clone(),
            request_timeout: Duration::from_secs(settings.llm.request_timeout_secs),
        })?);

        let whisper = &settings.speech.whisper;
        let stt = Arc::new(SttEngine::new(SttConfig {
            binary: whisper.binary.clone(),
            model: whisper.model.clone(),
            language: whisper.language.clone(),
            threads: whisper.threads,
            beam_size: whisper.beam_size,
            best_of: whisper.best_of,
            temperature: whisper.temperature,
            print_timestamps: whisper.print_timestamps,
            use_mock: settings.speech.use_mock,
        }));

        let tts = Arc::new(TtsEngine::new(TtsConfig {
            binary: settings.speech.piper.binary.clone(),
            model: settings.speech.piper.model.clone(),
            use_mock: settings.speech.use_mock,
            ..Default::default()
        }));

        let audio = AudioStore::new(&settings.data.directory)?;

        Ok(Self::with_services(settings, llm, stt, tts, audio))
    }

    /// Build the state from pre-constructed services (used by tests and any
    /// embedder that wants to inject its own backend)
    pub fn with_services(
        settings: Settings,
        llm: Arc<dyn ChatBackend>,
        stt: Arc<SttEngine>,
        tts: Arc<TtsEngine>,
        audio: AudioStore,
    ) -> Self {
        let chat = ConstrainedGenerator::new(
            llm.clone(),
            settings.llm.response_rules,
            settings.llm.default_temperature,
        );
        Self {
            settings: Arc::new(settings),
            llm,
            chat,
            stt,
            tts,
            audio,
        }
    }
}
