use super::turn::MediaFile;
use crate::device::ActiveRecording;
use crate::mode::Mode;

/// Where the recording session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    CapturingPhoto,
    Recording,
    Stopping,
    Uploading,
    PlayingResponse,
}

/// Notices published while a turn runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    /// The answer text, published before any speech is played
    Answer(String),
    /// Human-readable description of a failed attempt
    Failed(String),
}

/// How a completed turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub answer: String,
    pub playback: PlaybackOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The service sent no speech
    TextOnly,
    Spoken,
    /// Speech was sent but could not be played; the answer text still stands
    Failed(String),
}

/// Media held between `start()` and `stop()`
pub(crate) struct PendingTurn {
    pub photo: MediaFile,
    pub recording: Box<dyn ActiveRecording>,
    pub mode: Mode,
    pub question: Option<String>,
}

/// The recording session state
///
/// The recording handle lives inside `Recording` and nowhere else, so it is
/// only reachable while the session is recording.
pub(crate) enum SessionState {
    Idle,
    CapturingPhoto,
    Recording(PendingTurn),
    Stopping,
    Uploading,
    PlayingResponse,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::CapturingPhoto => SessionPhase::CapturingPhoto,
            SessionState::Recording(_) => SessionPhase::Recording,
            SessionState::Stopping => SessionPhase::Stopping,
            SessionState::Uploading => SessionPhase::Uploading,
            SessionState::PlayingResponse => SessionPhase::PlayingResponse,
        }
    }
}
