use crate::device::RecordingPreset;
use std::path::PathBuf;

/// Configuration for the capture orchestrator
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Private cache for captured photos and finished recordings
    pub cache_dir: PathBuf,

    /// Microphone quality preset, fixed for every recording
    pub preset: RecordingPreset,

    /// Opaque user identifier forwarded with each turn
    pub user_id: String,

    /// Opaque conversation identifier forwarded with each turn
    pub chat_id: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("scene-assist").join("cache"),
            preset: RecordingPreset::HIGH_QUALITY,
            user_id: "anonymous".to_string(),
            chat_id: format!("chat-{}", uuid::Uuid::new_v4()),
        }
    }
}
