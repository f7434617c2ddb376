//! Text-to-speech via piper
//!
//! Feeds text to the piper CLI over stdin and reads back the WAV file it
//! writes. The mock path synthesizes a short reference tone so the pipeline
//! keeps producing playable audio without a piper install.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::SpeechError;

/// piper configuration
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// piper executable
    pub binary: PathBuf,
    /// Voice model (.onnx)
    pub model: PathBuf,
    /// Sample rate used for mock audio
    pub default_sample_rate: u32,
    /// Force mock synthesis regardless of runtime availability
    pub use_mock: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("models/tts/runtime/piper"),
            model: PathBuf::from("models/tts/voices/en_US-amy-medium.onnx"),
            default_sample_rate: 22050,
            use_mock: false,
        }
    }
}

/// Optional voice and prosody controls forwarded to piper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProsodyOptions {
    /// Speaker identifier for multi-speaker models
    pub voice: Option<String>,
    /// >1 slows speech down, <1 speeds it up
    pub length_scale: Option<f32>,
    /// Variation in speech energy; lower is calmer
    pub noise_scale: Option<f32>,
    /// Phoneme width variation; higher is more expressive
    pub noise_w: Option<f32>,
}

/// Synthesized speech audio
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Base64-encoded WAV payload
    pub audio_base64: String,
    /// Sample rate reported by the WAV header
    pub sample_rate: u32,
}

/// Text-to-speech engine wrapping the piper CLI
pub struct TtsEngine {
    config: TtsConfig,
}

impl TtsEngine {
    /// Create an engine
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    /// Synthesize text into WAV audio
    pub async fn synthesize(
        &self,
        text: &str,
        options: &ProsodyOptions,
    ) -> Result<Synthesis, SpeechError> {
        if self.config.use_mock || !self.runtime_available() {
            return self.mock_audio();
        }

        let output_file = tempfile::Builder::new()
            .prefix("piper_out_")
            .suffix(".wav")
            .tempfile()?;
        let output_path = output_file.path().to_path_buf();
        let args = self.build_args(&output_path, options);
        tracing::debug!(binary = %self.config.binary.display(), ?args, "running piper");

        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(status = ?output.status, "piper synthesis failed: {stderr}");
            return Err(SpeechError::Tts(stderr.trim().to_string()));
        }

        let audio_bytes = tokio::fs::read(&output_path).await?;
        let reader = hound::WavReader::open(&output_path)
            .map_err(|e| SpeechError::Audio(e.to_string()))?;
        let sample_rate = reader.spec().sample_rate;

        Ok(Synthesis {
            audio_base64: BASE64.encode(audio_bytes),
            sample_rate,
        })
    }

    fn build_args(&self, output_path: &std::path::Path, options: &ProsodyOptions) -> Vec<String> {
        let mut args = vec![
            "--model".to_string(),
            self.config.model.display().to_string(),
            "--output_file".to_string(),
            output_path.display().to_string(),
        ];
        if let Some(voice) = &options.voice {
            args.push("--speaker".to_string());
            args.push(voice.clone());
        }
        if let Some(length_scale) = options.length_scale {
            args.push("--length_scale".to_string());
            args.push(format!("{length_scale:.4}"));
        }
        if let Some(noise_scale) = options.noise_scale {
            args.push("--noise_scale".to_string());
            args.push(format!("{noise_scale:.4}"));
        }
        if let Some(noise_w) = options.noise_w {
            args.push("--noise_w".to_string());
            args.push(format!("{noise_w:.4}"));
        }
        args
    }

    fn runtime_available(&self) -> bool {
        self.config.binary.exists() && self.config.model.exists()
    }

    /// Short reference tone keeping the pipeline testable without piper
    fn mock_audio(&self) -> Result<Synthesis, SpeechError> {
        tracing::warn!("using mock TTS audio; verify piper binary and model paths");
        let sample_rate = self.config.default_sample_rate;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SpeechError::Audio(e.to_string()))?;
        let frequency = 440.0_f32;
        let total_samples = (0.5 * sample_rate as f32) as u32;
        for n in 0..total_samples {
            let t = n as f32 / sample_rate as f32;
            let sample = (32767.0 * (2.0 * std::f32::consts::PI * frequency * t).sin()) as i16;
            writer
                .write_sample(sample)
                .map_err(|e| SpeechError::Audio(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| SpeechError::Audio(e.to_string()))?;

        Ok(Synthesis {
            audio_base64: BASE64.encode(cursor.into_inner()),
            sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_build_args_minimal() {
        let engine = TtsEngine::new(TtsConfig::default());
        let args = engine.build_args(Path::new("/tmp/out.wav"), &ProsodyOptions::default());
        assert_eq!(args[0], "--model");
        assert_eq!(args[2], "--output_file");
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_build_args_with_prosody() {
        let engine = TtsEngine::new(TtsConfig::default());
        let options = ProsodyOptions {
            voice: Some("amy".to_string()),
            length_scale: Some(1.2),
            noise_scale: None,
            noise_w: Some(0.8),
        };
        let args = engine.build_args(Path::new("out.wav"), &options);
        assert!(args.windows(2).any(|w| w == ["--speaker", "amy"]));
        assert!(args.windows(2).any(|w| w == ["--length_scale", "1.2000"]));
        assert!(!args.contains(&"--noise_scale".to_string()));
        assert!(args.windows(2).any(|w| w == ["--noise_w", "0.8000"]));
    }

    #[tokio::test]
    async fn test_missing_runtime_falls_back_to_mock() {
        let engine = TtsEngine::new(TtsConfig {
            binary: PathBuf::from("/nonexistent/piper"),
            model: PathBuf::from("/nonexistent/voice.onnx"),
            ..Default::default()
        });
        let synthesis = engine
            .synthesize("Hello there", &ProsodyOptions::default())
            .await
            .unwrap();
        assert_eq!(synthesis.sample_rate, 22050);

        let bytes = BASE64.decode(synthesis.audio_base64).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[tokio::test]
    async fn test_mock_audio_is_deterministic() {
        let engine = TtsEngine::new(TtsConfig {
            use_mock: true,
            ..Default::default()
        });
        let first = engine
            .synthesize("one", &ProsodyOptions::default())
            .await
            .unwrap();
        let second = engine
            .synthesize("two", &ProsodyOptions::default())
            .await
            .unwrap();
        assert_eq!(first.audio_base64, second.audio_base64);
    }
}
