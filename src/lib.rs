pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod mode;
pub mod permission;
pub mod playback;
pub mod upload;

pub use capture::{
    CaptureConfig, CaptureOrchestrator, Devices, MediaFile, PlaybackOutcome, SessionEvent,
    SessionPhase, Turn, TurnOutcome,
};
pub use config::Config;
pub use device::{
    ActiveRecording, Camera, LoadedSound, LocalStorage, Microphone, PermissionStatus,
    RecordingPreset, Speaker, Storage,
};
pub use error::TurnError;
pub use mode::{Mode, ModeController};
pub use permission::{Authorization, PermissionGate};
pub use playback::ResponsePlayer;
pub use upload::{AnalysisResponse, HealthStatus, UploadClient};
