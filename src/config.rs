use crate::capture::CaptureConfig;
use crate::device::{RecordingPreset, Storage};
use crate::mode::Mode;
use crate::upload::UploadClient;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_dir: PathBuf,
    pub transient_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = std::env::temp_dir().join("scene-assist");
        Self {
            cache_dir: root.join("cache"),
            transient_dir: root.join("transient"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_id: String,
    pub chat_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            chat_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    #[default]
    High,
    Low,
}

impl PresetName {
    pub fn preset(self) -> RecordingPreset {
        match self {
            PresetName::High => RecordingPreset::HIGH_QUALITY,
            PresetName::Low => RecordingPreset::LOW_QUALITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub preset: PresetName,
    /// Mode the app starts in
    pub mode: Mode,
}

impl Config {
    /// Load `path` (any format the config crate knows, extension optional)
    /// with `SCENE_ASSIST__SECTION__KEY` environment overrides on top
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SCENE_ASSIST").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            cache_dir: self.storage.cache_dir.clone(),
            preset: self.capture.preset.preset(),
            user_id: self.session.user_id.clone(),
            chat_id: self.session.chat_id.clone(),
        }
    }

    pub fn upload_client(&self, storage: Arc<dyn Storage>) -> Result<UploadClient> {
        Ok(UploadClient::new(
            self.service.base_url.clone(),
            Duration::from_secs(self.service.timeout_secs),
            storage,
        )?)
    }
}
