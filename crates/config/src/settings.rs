//! Main settings module

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use english_coach_text_processing::ResponseRules;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM endpoint and task prompt configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Speech binary configuration
    #[serde(default)]
    pub speech: SpeechSettings,

    /// Persistent data configuration
    #[serde(default)]
    pub data: DataSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// LLM (OpenAI-compatible) endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of the local OpenAI-compatible server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default chat model name (requests may override)
    #[serde(default)]
    pub default_model: Option<String>,

    /// Temperature used when a chat request does not specify one
    #[serde(default)]
    pub default_temperature: f32,

    /// Timeout for non-streaming requests, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// System prompt prepended to chat conversations lacking one
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Hard constraints enforced on chat replies
    #[serde(default)]
    pub response_rules: ResponseRules,

    /// Translation task settings
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Grammar check task settings
    #[serde(default)]
    pub grammar: GrammarSettings,

    /// Dictionary lookup task settings
    #[serde(default)]
    pub dictionary: DictionarySettings,
}

fn default_base_url() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}
fn default_request_timeout_secs() -> u64 {
    60
}

fn default_system_prompt() -> String {
    "You are a friendly native English speaker helping a beginner practise spoken English. \
     Keep every reply to two or three short sentences. Never use contractions: write I am \
     instead of I'm, do not instead of don't, cannot instead of can't; never use apostrophes. \
     Use simple vocabulary and a natural tone, separating clauses with commas where it helps. \
     End questions with a question mark and statements with a full stop; never use quotation \
     marks, emoji, bullet points, numbered lists, or special symbols. Offer short encouragement \
     such as Good job or Keep going when it fits."
        .to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: None,
            default_temperature: 0.0,
            request_timeout_secs: default_request_timeout_secs(),
            system_prompt: default_system_prompt(),
            response_rules: ResponseRules::default(),
            translation: TranslationSettings::default(),
            grammar: GrammarSettings::default(),
            dictionary: DictionarySettings::default(),
        }
    }
}

/// Translation task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSettings {
    /// Optional model override for translation requests
    #[serde(default)]
    pub model: Option<String>,

    /// System prompt template with a `{target_language}` placeholder
    #[serde(default = "default_translation_prompt")]
    pub prompt_template: String,
}

fn default_translation_prompt() -> String {
    "You are an expert translator. Translate the user message into {target_language}. \
     Return only the translated text, with no extra commentary."
        .to_string()
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            model: None,
            prompt_template: default_translation_prompt(),
        }
    }
}

/// Grammar check task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarSettings {
    /// Optional model override for grammar requests
    #[serde(default)]
    pub model: Option<String>,

    /// System prompt instructing the model to emit a JSON verdict
    #[serde(default = "default_grammar_prompt")]
    pub prompt: String,

    /// How many trailing turns of prior conversation to fold into the prompt
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_grammar_prompt() -> String {
    "You are a friendly, encouraging English teacher reviewing a learner's reply. Read the \
     conversation context, then judge the learner's sentence. Mark is_correct false only for \
     clear mistakes: serious grammar errors, spelling errors, answers unrelated to the \
     question, or sentences too garbled to understand. Contractions and informal but \
     understandable phrasing count as correct, though you may still suggest improvements. \
     Return a single JSON object with keys \"is_correct\" (boolean), \"feedback\" (string in \
     Traditional Chinese, friendly and encouraging, explaining the problem or confirming the \
     sentence), and \"suggestion\" (string, always present, giving a more natural version of \
     the sentence). Output nothing outside the JSON object."
        .to_string()
}
fn default_context_turns() -> usize {
    6
}

impl Default for GrammarSettings {
    fn default() -> Self {
        Self {
            model: None,
            prompt: default_grammar_prompt(),
            context_turns: default_context_turns(),
        }
    }
}

/// Dictionary lookup task settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionarySettings {
    /// Optional model override for dictionary requests
    #[serde(default)]
    pub model: Option<String>,

    /// System prompt instructing the model to emit a JSON entry
    #[serde(default = "default_dictionary_prompt")]
    pub prompt: String,
}

fn default_dictionary_prompt() -> String {
    "You are an English learning assistant. The user sends a JSON object with a \"word\" key \
     and sometimes a \"sentence\" key giving the context the word appeared in. Return a single \
     JSON object with keys \"headword\" (string), \"part_of_speech\" (the Traditional Chinese \
     and English part-of-speech labels only, for example \u{52D5}\u{8A5E} verb, never the \
     meaning of the word), \"definition\" (a concise definition in Traditional Chinese only), \
     \"examples\" (an array of exactly 2 sentences, each containing the word and formatted as \
     the English sentence, a newline, then its Traditional Chinese translation), \"phonetics\" \
     (an array with the IPA transcription), and \"notes\" (a short usage note, may be empty). \
     Output nothing outside the JSON object."
        .to_string()
}

impl Default for DictionarySettings {
    fn default() -> Self {
        Self {
            model: None,
            prompt: default_dictionary_prompt(),
        }
    }
}

/// Speech binary settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SpeechSettings {
    /// whisper.cpp speech-to-text settings
    #[serde(default)]
    pub whisper: WhisperSettings,

    /// piper text-to-speech settings
    #[serde(default)]
    pub piper: PiperSettings,

    /// Switch to mock implementations even when the binaries exist
    #[serde(default)]
    pub use_mock: bool,
}

/// whisper.cpp settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSettings {
    /// whisper.cpp executable path
    #[serde(default = "default_whisper_binary")]
    pub binary: PathBuf,

    /// ggml model file path
    #[serde(default = "default_whisper_model")]
    pub model: PathBuf,

    /// Transcription language code
    #[serde(default = "default_language")]
    pub language: String,

    /// CPU threads allocated to whisper.cpp
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Beam search width (larger is better quality, slower)
    #[serde(default = "default_one")]
    pub beam_size: usize,

    /// Best-of candidates kept (larger is better quality, slower)
    #[serde(default = "default_one")]
    pub best_of: usize,

    /// Decoding sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Include timestamps in transcripts
    #[serde(default)]
    pub print_timestamps: bool,
}

fn default_whisper_binary() -> PathBuf {
    PathBuf::from("models/stt/whisper-cli")
}
fn default_whisper_model() -> PathBuf {
    PathBuf::from("models/stt/ggml-small.en-q5_1.bin")
}
fn default_language() -> String {
    "en".to_string()
}
fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
fn default_one() -> usize {
    1
}

impl Default for WhisperSettings {
    fn default() -> Self {
        Self {
            binary: default_whisper_binary(),
            model: default_whisper_model(),
            language: default_language(),
            threads: default_threads(),
            beam_size: default_one(),
            best_of: default_one(),
            temperature: 0.0,
            print_timestamps: false,
        }
    }
}

/// piper settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiperSettings {
    /// piper executable path
    #[serde(default = "default_piper_binary")]
    pub binary: PathBuf,

    /// Voice model path
    #[serde(default = "default_piper_model")]
    pub model: PathBuf,
}

fn default_piper_binary() -> PathBuf {
    PathBuf::from("models/tts/runtime/piper")
}
fn default_piper_model() -> PathBuf {
    PathBuf::from("models/tts/voices/en_US-amy-medium.onnx")
}

impl Default for PiperSettings {
    fn default() -> Self {
        Self {
            binary: default_piper_binary(),
            model: default_piper_model(),
        }
    }
}

/// Persistent data settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Base directory for audio artifacts written by the API
    #[serde(default = "default_data_directory")]
    pub directory: PathBuf,
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: default_data_directory(),
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "llm.base_url".to_string(),
                message: "base URL must not be empty".to_string(),
            });
        }
        let rules = &self.llm.response_rules;
        if rules.word_max == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.response_rules.word_max".to_string(),
                message: "maximum word count must be at least 1".to_string(),
            });
        }
        if rules.word_min > rules.word_max {
            return Err(ConfigError::InvalidValue {
                field: "llm.response_rules.word_min".to_string(),
                message: format!(
                    "minimum word count {} exceeds maximum {}",
                    rules.word_min, rules.word_max
                ),
            });
        }
        Ok(())
    }
}

/// Load settings from config files and environment variables.
///
/// Priority: env vars > `config/{env}.toml` > `config/default.toml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("ENGLISH_COACH")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}
