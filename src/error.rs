use thiserror::Error;

/// Everything that can end a capture attempt.
///
/// The `Display` text is what the user is shown. None of these are fatal to
/// the process; a failed attempt always returns the session to Idle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error("Camera and microphone access are required (camera granted: {camera}, microphone granted: {microphone})")]
    PermissionDenied { camera: bool, microphone: bool },

    #[error("Could not take a photo: {0}")]
    CaptureFailed(String),

    #[error("Could not record audio: {0}")]
    RecordingFailed(String),

    #[error("Could not save media: {0}")]
    StorageFailed(String),

    #[error("Could not reach the analysis service: {0}")]
    NetworkFailed(String),

    #[error("Analysis service returned HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Analysis service sent an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("Could not play the spoken answer: {0}")]
    PlaybackFailed(String),

    #[error("A question is already being captured or answered")]
    AlreadyInProgress,

    #[error("No recording is in progress")]
    NoActiveRecording,

    /// The caller dropped the attempt before it finished
    #[error("The request was interrupted before it finished")]
    Interrupted,
}

impl TurnError {
    /// Wrap an `anyhow` chain, keeping every context layer in the message.
    pub(crate) fn capture(err: anyhow::Error) -> Self {
        Self::CaptureFailed(format!("{err:#}"))
    }

    pub(crate) fn recording(err: anyhow::Error) -> Self {
        Self::RecordingFailed(format!("{err:#}"))
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::StorageFailed(format!("{err:#}"))
    }

    pub(crate) fn playback(err: anyhow::Error) -> Self {
        Self::PlaybackFailed(format!("{err:#}"))
    }
}
