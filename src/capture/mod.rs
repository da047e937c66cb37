//! Capture orchestration
//!
//! This module owns the recording session state machine:
//! - Photo capture into the private cache
//! - Microphone recording between `start()` and `stop()`
//! - Turn assembly, upload and spoken answer playback
//! - Cleanup of every file the attempt created

mod config;
mod orchestrator;
mod state;
mod turn;

pub use config::CaptureConfig;
pub use orchestrator::{CaptureOrchestrator, Devices};
pub use state::{PlaybackOutcome, SessionEvent, SessionPhase, TurnOutcome};
pub use turn::{MediaFile, Turn, PHOTO_MIME};
