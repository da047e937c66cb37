use crate::mode::Mode;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PHOTO_MIME: &str = "image/jpeg";

/// A media file on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    pub mime_type: String,
}

impl MediaFile {
    pub fn new(path: PathBuf, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            path,
            size,
            mime_type: mime_type.into(),
        }
    }

    /// File name used for the multipart part
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }
}

/// One question about one scene, ready for upload
///
/// Only built once both the photo and the audio are on disk, and never
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct Turn {
    id: Uuid,
    created_at: DateTime<Utc>,
    photo: MediaFile,
    audio: MediaFile,
    mode: Mode,
    user_id: String,
    chat_id: String,
    question: Option<String>,
}

impl Turn {
    pub fn new(
        photo: MediaFile,
        audio: MediaFile,
        mode: Mode,
        user_id: impl Into<String>,
        chat_id: impl Into<String>,
        question: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            photo,
            audio,
            mode,
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            // An empty override means "derive the question from the audio"
            question: question.filter(|q| !q.trim().is_empty()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn photo(&self) -> &MediaFile {
        &self.photo
    }

    pub fn audio(&self) -> &MediaFile {
        &self.audio
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// Paths of every file this turn owns
    pub fn files(&self) -> [&Path; 2] {
        [self.photo.path.as_path(), self.audio.path.as_path()]
    }
}
