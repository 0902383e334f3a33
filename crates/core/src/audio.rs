//! Audio persistence collaborator.
//!
//! Binary frames are stored verbatim; transcription happens elsewhere. The
//! store reports either a filename for the saved payload or the reason
//! saving failed, never both.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// A successfully persisted audio payload.
#[derive(Debug, Clone)]
pub struct SavedAudio {
    pub filename: String,
}

/// Stores raw audio payloads received over the wire.
#[async_trait]
pub trait AudioStore: Send + Sync {
    async fn save(&self, bytes: &[u8]) -> Result<SavedAudio>;
}

/// `AudioStore` writing timestamped `.wav` files under an upload directory.
pub struct FsAudioStore {
    upload_dir: PathBuf,
}

impl FsAudioStore {
    /// Creates the store, making sure the upload directory exists.
    pub async fn new(upload_dir: impl Into<PathBuf>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create upload directory {}",
                    upload_dir.display()
                )
            })?;
        info!(dir = %upload_dir.display(), "audio store initialized");
        Ok(Self { upload_dir })
    }
}

#[async_trait]
impl AudioStore for FsAudioStore {
    async fn save(&self, bytes: &[u8]) -> Result<SavedAudio> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%6f");
        let filename = format!("audio_{timestamp}.wav");
        let path = self.upload_dir.join(&filename);

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to save audio file {}", path.display()))?;

        info!(file = %path.display(), size = bytes.len(), "audio payload saved");
        Ok(SavedAudio { filename })
    }
}
