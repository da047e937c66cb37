//! Headless device backends
//!
//! Stand-ins for the platform camera, microphone and speaker so the pipeline
//! can run from a terminal: the "camera" serves an existing JPEG, the
//! "microphone" hands back a copy of a pre-recorded clip, and the "speaker"
//! decodes the answer with symphonia instead of rendering it.

use super::{ActiveRecording, Camera, LoadedSound, Microphone, PermissionStatus, RecordingPreset, Speaker};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::errors::Error as SymphoniaError;
use tracing::{debug, info, warn};

/// Camera that "captures" a still image already on disk
pub struct HeadlessCamera {
    image: PathBuf,
}

impl HeadlessCamera {
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self { image: image.into() }
    }
}

#[async_trait::async_trait]
impl Camera for HeadlessCamera {
    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn capture_still(&self) -> Result<PathBuf> {
        if !tokio::fs::try_exists(&self.image).await.unwrap_or(false) {
            anyhow::bail!("Image not found: {}", self.image.display());
        }
        info!("Captured still from {}", self.image.display());
        Ok(self.image.clone())
    }
}

/// Microphone that replays a pre-recorded clip
///
/// Each recording yields a fresh copy of the clip in `scratch_dir`, the way a
/// platform recorder leaves its output in a temporary location.
pub struct HeadlessMicrophone {
    clip: PathBuf,
    scratch_dir: PathBuf,
}

impl HeadlessMicrophone {
    pub fn new(clip: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            clip: clip.into(),
            scratch_dir: scratch_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl Microphone for HeadlessMicrophone {
    async fn permission_status(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn start(&self, preset: RecordingPreset) -> Result<Box<dyn ActiveRecording>> {
        if !tokio::fs::try_exists(&self.clip).await.unwrap_or(false) {
            anyhow::bail!("Audio clip not found: {}", self.clip.display());
        }
        info!(
            "Recording started ({}Hz, {}ch, {}bps)",
            preset.sample_rate, preset.channels, preset.bit_rate
        );

        Ok(Box::new(HeadlessRecording {
            clip: self.clip.clone(),
            output: self
                .scratch_dir
                .join(format!("recording-{}.{}", uuid::Uuid::new_v4(), preset.extension)),
        }))
    }
}

struct HeadlessRecording {
    clip: PathBuf,
    output: PathBuf,
}

#[async_trait::async_trait]
impl ActiveRecording for HeadlessRecording {
    async fn stop(&mut self) -> Result<PathBuf> {
        if let Some(parent) = self.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create recorder scratch directory")?;
        }
        tokio::fs::copy(&self.clip, &self.output)
            .await
            .context("Failed to finalize recording")?;

        info!("Recording stopped: {}", self.output.display());
        Ok(self.output.clone())
    }
}

/// Speaker that decodes instead of rendering
///
/// Loading decodes the whole file, so an unplayable payload fails before
/// playback starts. With `realtime` set, `finished()` waits for the decoded
/// duration.
pub struct HeadlessSpeaker {
    realtime: bool,
}

impl HeadlessSpeaker {
    pub fn new(realtime: bool) -> Self {
        Self { realtime }
    }
}

#[async_trait::async_trait]
impl Speaker for HeadlessSpeaker {
    async fn load(&self, path: &Path) -> Result<Box<dyn LoadedSound>> {
        let owned = path.to_path_buf();
        let duration = tokio::task::spawn_blocking(move || decoded_duration(&owned))
            .await
            .context("Decoder task panicked")??;

        info!("Loaded {} ({:.2}s)", path.display(), duration.as_secs_f64());

        Ok(Box::new(HeadlessSound {
            duration,
            realtime: self.realtime,
        }))
    }
}

struct HeadlessSound {
    duration: Duration,
    realtime: bool,
}

#[async_trait::async_trait]
impl LoadedSound for HeadlessSound {
    async fn start(&mut self) -> Result<()> {
        debug!("Playback started");
        Ok(())
    }

    async fn finished(&mut self) -> Result<()> {
        if self.realtime {
            tokio::time::sleep(self.duration).await;
        }
        debug!("Playback finished");
        Ok(())
    }

    async fn unload(&mut self) -> Result<()> {
        debug!("Sound unloaded");
        Ok(())
    }
}

/// Frames in one decoded packet; a corrupt packet counts as none
fn packet_frames(decoded: Result<usize, SymphoniaError>) -> Result<u64> {
    match decoded {
        Ok(frames) => Ok(frames as u64),
        Err(SymphoniaError::DecodeError(reason)) => {
            warn!("Skipping undecodable audio packet: {}", reason);
            Ok(0)
        }
        Err(e) => Err(e).context("Failed to decode audio"),
    }
}

/// Decode every packet of the first audio track and return its duration
fn decoded_duration(path: &Path) -> Result<Duration> {
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Unrecognized audio format")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow::anyhow!("No audio track found"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow::anyhow!("Audio track has no sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;

    let mut frames: u64 = 0;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        frames += packet_frames(decoder.decode(&packet).map(|decoded| decoded.frames()))?;
    }

    Ok(Duration::from_secs_f64(frames as f64 / sample_rate as f64))
}
