//! Device capabilities consumed by the capture pipeline
//!
//! The pipeline never talks to a platform media stack directly. Camera,
//! microphone, speaker and local storage are reached through the traits in
//! this module so that a platform build, the headless backends and the test
//! fakes are interchangeable.

pub mod headless;
pub mod storage;

pub use headless::{HeadlessCamera, HeadlessMicrophone, HeadlessSpeaker};
pub use storage::{LocalStorage, Storage};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Platform authorization state for a single capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Quality preset handed to the microphone when recording starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingPreset {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Encoder bit rate in bits per second
    pub bit_rate: u32,
    /// Extension of the produced file (without the dot)
    pub extension: &'static str,
    /// MIME type sent along with the recording
    pub mime_type: &'static str,
}

impl RecordingPreset {
    /// AAC in an m4a container, 44.1kHz stereo
    pub const HIGH_QUALITY: RecordingPreset = RecordingPreset {
        sample_rate: 44_100,
        channels: 2,
        bit_rate: 128_000,
        extension: "m4a",
        mime_type: "audio/m4a",
    };

    /// AAC in an m4a container, 44.1kHz mono
    pub const LOW_QUALITY: RecordingPreset = RecordingPreset {
        sample_rate: 44_100,
        channels: 1,
        bit_rate: 64_000,
        extension: "m4a",
        mime_type: "audio/m4a",
    };
}

impl Default for RecordingPreset {
    fn default() -> Self {
        Self::HIGH_QUALITY
    }
}

/// Still camera
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Current authorization, without prompting
    async fn permission_status(&self) -> Result<PermissionStatus>;

    /// Prompt the user for camera access
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Take a still photo
    ///
    /// Returns the location the platform wrote the JPEG to. That file stays
    /// owned by the platform; callers copy it before use.
    async fn capture_still(&self) -> Result<PathBuf>;
}

/// Microphone capture
#[async_trait::async_trait]
pub trait Microphone: Send + Sync {
    /// Current authorization, without prompting
    async fn permission_status(&self) -> Result<PermissionStatus>;

    /// Prompt the user for microphone access
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Begin recording with the given preset
    async fn start(&self, preset: RecordingPreset) -> Result<Box<dyn ActiveRecording>>;
}

/// A recording in progress
#[async_trait::async_trait]
pub trait ActiveRecording: Send {
    /// Stop and finalize the capture
    ///
    /// Returns the temporary location of the finished recording. Called at
    /// most once.
    async fn stop(&mut self) -> Result<PathBuf>;
}

/// Audio output
#[async_trait::async_trait]
pub trait Speaker: Send + Sync {
    /// Load an audio file for playback
    async fn load(&self, path: &Path) -> Result<Box<dyn LoadedSound>>;
}

/// A loaded sound owned by the player until unloaded
#[async_trait::async_trait]
pub trait LoadedSound: Send {
    /// Begin playback
    async fn start(&mut self) -> Result<()>;

    /// Resolves when playback reaches its natural end
    async fn finished(&mut self) -> Result<()>;

    /// Release the underlying player resource
    async fn unload(&mut self) -> Result<()>;
}
