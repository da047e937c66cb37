use crate::device::{LoadedSound, Speaker, Storage};
use crate::error::TurnError;
use base64::Engine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ResponsePlayer {
    speaker: Arc<dyn Speaker>,
    storage: Arc<dyn Storage>,
    transient_dir: PathBuf,
}

impl ResponsePlayer {
    pub fn new(
        speaker: Arc<dyn Speaker>,
        storage: Arc<dyn Storage>,
        transient_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            speaker,
            storage,
            transient_dir: transient_dir.into(),
        }
    }

    /// Decode, play to completion, and delete the decoded file
    pub async fn play(&self, audio_base64: &str) -> Result<(), TurnError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio_base64.trim())
            .map_err(|e| TurnError::PlaybackFailed(format!("Invalid base64 audio: {}", e)))?;

        let mut transient = TransientFile::new(
            self.transient_dir
                .join(format!("response_{}.wav", uuid::Uuid::new_v4())),
        );
        let path = transient.path.clone();

        if let Err(e) = self.storage.write(&path, &bytes).await {
            // A partial write may have left something behind
            self.discard(&path).await;
            transient.release();
            return Err(TurnError::storage(e));
        }
        debug!("Decoded {} bytes of speech to {}", bytes.len(), path.display());

        let result = self.play_file(&path).await;
        self.discard(&path).await;
        transient.release();
        result
    }

    async fn play_file(&self, path: &Path) -> Result<(), TurnError> {
        let mut sound = self.speaker.load(path).await.map_err(TurnError::playback)?;

        if let Err(e) = sound.start().await {
            Self::unload(sound.as_mut()).await;
            return Err(TurnError::playback(e));
        }
        info!("Playing spoken answer");

        let finished = sound.finished().await;
        Self::unload(sound.as_mut()).await;

        finished.map_err(TurnError::playback)?;
        info!("Spoken answer finished");
        Ok(())
    }

    async fn unload(sound: &mut dyn LoadedSound) {
        if let Err(e) = sound.unload().await {
            warn!("Failed to unload sound: {:#}", e);
        }
    }

    async fn discard(&self, path: &Path) {
        if !self.storage.exists(path).await {
            return;
        }
        if let Err(e) = self.storage.delete(path).await {
            warn!("Failed to delete {}: {:#}", path.display(), e);
        }
    }
}

/// Removes the decoded speech file if playback is dropped part way
struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Already deleted through storage
    fn release(&mut self) {
        self.armed = false;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed abandoned {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to delete {}: {}", self.path.display(), e),
        }
    }
}
