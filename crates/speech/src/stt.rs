//! Speech-to-text via whisper.cpp
//!
//! Runs the whisper.cpp CLI against an audio file and reads back the text
//! transcript it writes. Inference happens in a scratch directory that is
//! removed when the request finishes.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::SpeechError;

/// whisper.cpp configuration
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// whisper.cpp executable
    pub binary: PathBuf,
    /// ggml model file
    pub model: PathBuf,
    /// Transcription language code
    pub language: String,
    /// CPU threads handed to whisper.cpp
    pub threads: usize,
    /// Beam search width (larger is slower, better)
    pub beam_size: usize,
    /// Candidates kept per decode step
    pub best_of: usize,
    /// Decoding sampling temperature
    pub temperature: f32,
    /// Include timestamps in the transcript output
    pub print_timestamps: bool,
    /// Force mock transcription regardless of runtime availability
    pub use_mock: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("models/stt/whisper-cli"),
            model: PathBuf::from("models/stt/ggml-small.en-q5_1.bin"),
            language: "en".to_string(),
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            beam_size: 1,
            best_of: 1,
            temperature: 0.0,
            print_timestamps: false,
            use_mock: false,
        }
    }
}

/// Speech-to-text engine wrapping the whisper.cpp CLI
pub struct SttEngine {
    config: SttConfig,
}

impl SttEngine {
    /// Create an engine, clamping degenerate tuning values
    pub fn new(mut config: SttConfig) -> Self {
        config.threads = config.threads.max(1);
        config.beam_size = config.beam_size.max(1);
        config.best_of = config.best_of.max(1);
        config.temperature = config.temperature.max(0.0);
        Self { config }
    }

    /// Transcribe an audio file into text
    pub async fn transcribe(&self, audio_path: &Path) -> Result<String, SpeechError> {
        if self.config.use_mock || !self.runtime_available() {
            return Ok(self.mock_transcription(audio_path));
        }

        let scratch = tempfile::Builder::new().prefix("whisper_tmp_").tempdir()?;
        let output_prefix = scratch.path().join("transcription");
        let args = self.build_args(audio_path, &output_prefix);
        tracing::debug!(binary = %self.config.binary.display(), ?args, "running whisper.cpp");

        let output = Command::new(&self.config.binary).args(&args).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(status = ?output.status, "whisper.cpp execution failed: {stderr}");
            return Err(SpeechError::Stt(stderr.trim().to_string()));
        }

        let transcript_path = output_prefix.with_extension("txt");
        let transcript = tokio::fs::read_to_string(&transcript_path).await?;
        Ok(transcript.trim().to_string())
    }

    fn build_args(&self, audio_path: &Path, output_prefix: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.config.model.display().to_string(),
            "-f".to_string(),
            audio_path.display().to_string(),
            "-otxt".to_string(),
            "-of".to_string(),
            output_prefix.display().to_string(),
            "-l".to_string(),
            self.config.language.clone(),
            "--threads".to_string(),
            self.config.threads.to_string(),
            "--beam-size".to_string(),
            self.config.beam_size.to_string(),
            "--best-of".to_string(),
            self.config.best_of.to_string(),
            "--temperature".to_string(),
            format!("{:.2}", self.config.temperature),
        ];
        if !self.config.print_timestamps {
            args.push("--no-timestamps".to_string());
        }
        args.push("--no-fallback".to_string());
        args
    }

    fn runtime_available(&self) -> bool {
        self.config.binary.exists() && self.config.model.exists()
    }

    fn mock_transcription(&self, audio_path: &Path) -> String {
        tracing::warn!("using mock transcription; verify whisper.cpp binary and model paths");
        let placeholder = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        format!("[mock-transcription] Detected speech from {placeholder}")
    }
}
