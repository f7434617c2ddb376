//! Configuration management for the english-coach backend
//!
//! Supports loading configuration from:
//! - TOML files (`config/default.toml`, plus an environment-specific file)
//! - Environment variables (`ENGLISH_COACH_` prefix, `__` separator)
//!
//! Every section is serde-defaulted so a missing file still yields a usable
//! development configuration.

pub mod settings;

pub use settings::{
    load_settings, DataSettings, DictionarySettings, GrammarSettings, LlmSettings, PiperSettings,
    ServerConfig, Settings, SpeechSettings, TranslationSettings, WhisperSettings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
