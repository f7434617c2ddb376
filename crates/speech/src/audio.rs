//! On-disk audio artifact store
//!
//! Synthesized audio is persisted for audit; uploaded audio is persisted just
//! long enough to transcribe. The store is append-only with timestamp-named
//! files.

use std::path::{Path, PathBuf};

use crate::SpeechError;

/// Append-only store rooted at `<base>/audio`
#[derive(Debug, Clone)]
pub struct AudioStore {
    audio_dir: PathBuf,
}

impl AudioStore {
    /// Ensure the data and audio directories exist
    pub fn new(base_dir: &Path) -> Result<Self, SpeechError> {
        let audio_dir = base_dir.join("audio");
        std::fs::create_dir_all(&audio_dir)?;
        Ok(Self { audio_dir })
    }

    /// Directory audio files are written into
    pub fn dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Persist raw audio bytes under a timestamped name.
    ///
    /// File names have second granularity; two writes within the same second
    /// overwrite each other. Accepted limitation, not an invariant.
    pub fn save(&self, bytes: &[u8], suffix: &str) -> Result<PathBuf, SpeechError> {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = self.audio_dir.join(format!("{timestamp}{suffix}"));
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "stored audio artifact");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_creates_audio_dir() {
        let base = tempfile::tempdir().unwrap();
        let store = AudioStore::new(base.path()).unwrap();
        assert!(store.dir().is_dir());
        assert!(store.dir().ends_with("audio"));
    }

    #[test]
    fn test_save_writes_timestamped_file() {
        let base = tempfile::tempdir().unwrap();
        let store = AudioStore::new(base.path()).unwrap();
        let path = store.save(b"RIFF....", ".wav").unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("wav"));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF....");
    }
}
