use super::config::CaptureConfig;
use super::state::{PendingTurn, PlaybackOutcome, SessionEvent, SessionPhase, SessionState, TurnOutcome};
use super::turn::{MediaFile, Turn, PHOTO_MIME};
use crate::device::{Camera, Microphone, Storage};
use crate::error::TurnError;
use crate::mode::ModeController;
use crate::permission::{Authorization, PermissionGate};
use crate::playback::ResponsePlayer;
use crate::upload::UploadClient;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Device capabilities used for capture
#[derive(Clone)]
pub struct Devices {
    pub camera: Arc<dyn Camera>,
    pub microphone: Arc<dyn Microphone>,
    pub storage: Arc<dyn Storage>,
}

/// Drives one capture attempt at a time from photo to spoken answer
///
/// `start()` takes the photo and begins recording; `stop()` finishes the
/// recording and runs the upload and playback to completion. Both reject
/// calls made in the wrong phase instead of queueing them, and every failure
/// returns the session to Idle so the user can try again.
pub struct CaptureOrchestrator {
    config: CaptureConfig,
    devices: Devices,
    permissions: PermissionGate,
    uploader: UploadClient,
    player: ResponsePlayer,
    mode: Arc<ModeController>,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl CaptureOrchestrator {
    pub fn new(
        config: CaptureConfig,
        devices: Devices,
        uploader: UploadClient,
        player: ResponsePlayer,
        mode: Arc<ModeController>,
    ) -> Self {
        let permissions =
            PermissionGate::new(Arc::clone(&devices.camera), Arc::clone(&devices.microphone));
        let (events, _) = broadcast::channel(32);

        Self {
            config,
            devices,
            permissions,
            uploader,
            player,
            mode,
            state: Mutex::new(SessionState::Idle),
            events,
        }
    }

    /// Current phase of the recording session
    pub fn phase(&self) -> SessionPhase {
        self.lock().phase()
    }

    /// Receive phase changes, answers and failure notices
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Take a photo and begin recording the spoken question
    pub async fn start(&self) -> Result<(), TurnError> {
        self.start_with_question(None).await
    }

    /// Like `start()`, with a typed question sent instead of deriving one
    /// from the audio
    pub async fn start_with_question(&self, question: Option<String>) -> Result<(), TurnError> {
        {
            let mut state = self.lock();
            if !matches!(*state, SessionState::Idle) {
                warn!("Start rejected: session is {:?}", state.phase());
                return Err(TurnError::AlreadyInProgress);
            }
            *state = SessionState::CapturingPhoto;
        }
        self.publish_phase(SessionPhase::CapturingPhoto);

        let mut attempt = Attempt::new(self);
        let result = self.begin_recording(&mut attempt, question).await;
        attempt.disarm();
        result.map_err(|e| self.fail(e))
    }

    async fn begin_recording(
        &self,
        attempt: &mut Attempt<'_>,
        question: Option<String>,
    ) -> Result<(), TurnError> {
        if let Authorization::Denied { camera, microphone } = self.permissions.ensure().await {
            return Err(TurnError::PermissionDenied { camera, microphone });
        }

        let photo = self.capture_photo(attempt).await?;

        // The turn keeps the mode that was active when recording began
        let mode = self.mode.current();

        let recording = match self.devices.microphone.start(self.config.preset).await {
            Ok(recording) => recording,
            Err(e) => {
                self.delete_quietly(&photo.path).await;
                return Err(TurnError::recording(e));
            }
        };

        self.set_state(SessionState::Recording(PendingTurn {
            photo,
            recording,
            mode,
            question,
        }));
        info!("Recording question (mode={})", mode);
        Ok(())
    }

    /// Finish the recording, upload the turn and play back the answer
    pub async fn stop(&self) -> Result<TurnOutcome, TurnError> {
        let pending = self.take_recording()?;
        self.publish_phase(SessionPhase::Stopping);

        let mut attempt = Attempt::new(self);
        let result = self.finish_turn(&mut attempt, pending).await;
        attempt.disarm();
        result.map_err(|e| self.fail(e))
    }

    async fn finish_turn(
        &self,
        attempt: &mut Attempt<'_>,
        pending: PendingTurn,
    ) -> Result<TurnOutcome, TurnError> {
        let PendingTurn {
            photo,
            mut recording,
            mode,
            question,
        } = pending;
        attempt.track(&photo.path);

        let recorded = match recording.stop().await {
            Ok(path) => path,
            Err(e) => {
                self.delete_quietly(&photo.path).await;
                return Err(TurnError::recording(e));
            }
        };
        drop(recording);
        attempt.track(&recorded);

        let audio_path = self.config.cache_dir.join(format!(
            "recording_{}_{}.{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4(),
            self.config.preset.extension
        ));
        attempt.track(&audio_path);
        let audio_size = match self.devices.storage.move_file(&recorded, &audio_path).await {
            Ok(size) => size,
            Err(e) => {
                self.delete_quietly(&photo.path).await;
                self.delete_quietly(&recorded).await;
                self.delete_quietly(&audio_path).await;
                return Err(TurnError::storage(e));
            }
        };

        let turn = Turn::new(
            photo,
            MediaFile::new(audio_path, audio_size, self.config.preset.mime_type),
            mode,
            self.config.user_id.clone(),
            self.config.chat_id.clone(),
            question,
        );
        info!(
            "Turn {} assembled at {}",
            turn.id(),
            turn.created_at().to_rfc3339()
        );

        self.set_state(SessionState::Uploading);
        let sent = self.uploader.send(&turn).await;
        for file in turn.files() {
            self.delete_quietly(file).await;
        }
        attempt.forget_files();
        let response = sent?;

        let _ = self.events.send(SessionEvent::Answer(response.answer.clone()));

        let playback = match response.audio_payload.as_deref() {
            None => PlaybackOutcome::TextOnly,
            Some(payload) => {
                self.set_state(SessionState::PlayingResponse);
                match self.player.play(payload).await {
                    Ok(()) => PlaybackOutcome::Spoken,
                    Err(e) => {
                        error!("Turn {} playback failed: {}", turn.id(), e);
                        let _ = self.events.send(SessionEvent::Failed(e.to_string()));
                        PlaybackOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        self.set_state(SessionState::Idle);
        info!("Turn {} complete ({:?})", turn.id(), playback);

        Ok(TurnOutcome {
            answer: response.answer,
            playback,
        })
    }

    /// Abandon the current recording without uploading anything
    pub async fn cancel(&self) -> Result<(), TurnError> {
        let PendingTurn {
            photo,
            mut recording,
            ..
        } = self.take_recording()?;
        self.publish_phase(SessionPhase::Stopping);

        let mut attempt = Attempt::new(self);
        attempt.track(&photo.path);

        match recording.stop().await {
            Ok(path) => self.delete_quietly(&path).await,
            Err(e) => warn!("Failed to stop cancelled recording: {:#}", e),
        }
        self.delete_quietly(&photo.path).await;
        attempt.disarm();

        self.set_state(SessionState::Idle);
        info!("Recording cancelled");
        Ok(())
    }

    async fn capture_photo(&self, attempt: &mut Attempt<'_>) -> Result<MediaFile, TurnError> {
        let captured = self
            .devices
            .camera
            .capture_still()
            .await
            .map_err(TurnError::capture)?;

        let path = self.photo_path();
        attempt.track(&path);
        match self.devices.storage.copy(&captured, &path).await {
            Ok(size) => {
                info!("Photo saved to {} ({} bytes)", path.display(), size);
                Ok(MediaFile::new(path, size, PHOTO_MIME))
            }
            Err(e) => {
                self.delete_quietly(&path).await;
                Err(TurnError::storage(e))
            }
        }
    }

    fn photo_path(&self) -> PathBuf {
        self.config
            .cache_dir
            .join(format!("photo_{}.jpg", Utc::now().timestamp_millis()))
    }

    /// Move the session from Recording to Stopping, handing back its media
    fn take_recording(&self) -> Result<PendingTurn, TurnError> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, SessionState::Stopping) {
            SessionState::Recording(pending) => Ok(pending),
            other => {
                warn!("Stop rejected: session is {:?}", other.phase());
                *state = other;
                Err(TurnError::NoActiveRecording)
            }
        }
    }

    fn set_state(&self, next: SessionState) {
        let phase = next.phase();
        *self.lock() = next;
        self.publish_phase(phase);
    }

    fn publish_phase(&self, phase: SessionPhase) {
        info!("Session -> {:?}", phase);
        let _ = self.events.send(SessionEvent::PhaseChanged(phase));
    }

    /// Surface a failed attempt and return to Idle
    fn fail(&self, err: TurnError) -> TurnError {
        error!("Turn failed: {}", err);
        let _ = self.events.send(SessionEvent::Failed(err.to_string()));
        self.set_state(SessionState::Idle);
        err
    }

    async fn delete_quietly(&self, path: &Path) {
        if !self.devices.storage.exists(path).await {
            return;
        }
        if let Err(e) = self.devices.storage.delete(path).await {
            warn!("Failed to delete {}: {:#}", path.display(), e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Puts the session back to Idle if a `start()`, `stop()` or `cancel()`
/// future is dropped before it finishes, deleting the files it owned
struct Attempt<'a> {
    orchestrator: &'a CaptureOrchestrator,
    files: Vec<PathBuf>,
    armed: bool,
}

impl<'a> Attempt<'a> {
    fn new(orchestrator: &'a CaptureOrchestrator) -> Self {
        Self {
            orchestrator,
            files: Vec::new(),
            armed: true,
        }
    }

    fn track(&mut self, path: &Path) {
        self.files.push(path.to_path_buf());
    }

    /// The files have been handed off or deleted
    fn forget_files(&mut self) {
        self.files.clear();
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // No runtime to await on here
        for file in &self.files {
            match std::fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete {}: {}", file.display(), e),
            }
        }
        self.orchestrator.fail(TurnError::Interrupted);
    }
}
