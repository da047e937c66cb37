use super::messages::{AnalysisResponse, HealthStatus};
use crate::capture::{MediaFile, Turn};
use crate::device::Storage;
use crate::error::TurnError;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Client for the remote Analysis Service
///
/// One request per turn. Nothing is retried here; whether to let the user
/// record again is up to the caller.
pub struct UploadClient {
    client: Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl UploadClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, TurnError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TurnError::NetworkFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the turn to `/vision` and decode the answer
    pub async fn send(&self, turn: &Turn) -> Result<AnalysisResponse, TurnError> {
        // Both files must still be there before anything goes on the wire
        for file in turn.files() {
            if !self.storage.exists(file).await {
                error!("Turn {} lost {} before upload", turn.id(), file.display());
                return Err(TurnError::StorageFailed(format!(
                    "{} no longer exists",
                    file.display()
                )));
            }
        }

        let form = Form::new()
            .part("file", self.file_part(turn.photo()).await?)
            .part("audio", self.file_part(turn.audio()).await?)
            .text("user_id", turn.user_id().to_string())
            .text("chat_id", turn.chat_id().to_string())
            .text("mode", turn.mode().as_str().to_string())
            .text("question", turn.question().unwrap_or_default().to_string());

        let url = format!("{}/vision", self.base_url);
        info!(
            "Uploading turn {} to {} (photo={}B, audio={}B, mode={})",
            turn.id(),
            url,
            turn.photo().size,
            turn.audio().size,
            turn.mode()
        );

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| TurnError::NetworkFailed(e.to_string()))?;

        let mut answer: AnalysisResponse = Self::decode(response).await?;
        if answer.audio_payload.as_deref().is_some_and(str::is_empty) {
            answer.audio_payload = None;
        }

        info!(
            "Turn {} answered ({} chars, speech={})",
            turn.id(),
            answer.answer.len(),
            !answer.is_text_only()
        );
        Ok(answer)
    }

    /// GET `/health`
    pub async fn health(&self) -> Result<HealthStatus, TurnError> {
        let url = format!("{}/health", self.base_url);
        debug!("Checking {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TurnError::NetworkFailed(e.to_string()))?;

        Self::decode(response).await
    }

    async fn file_part(&self, media: &MediaFile) -> Result<Part, TurnError> {
        let bytes = self.storage.read(&media.path).await.map_err(TurnError::storage)?;

        Part::bytes(bytes)
            .file_name(media.file_name())
            .mime_str(&media.mime_type)
            .map_err(|e| TurnError::StorageFailed(format!("Invalid MIME type {}: {}", media.mime_type, e)))
    }

    /// Read the body as text, then decode it
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, TurnError> {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if !status.is_success() => format!("<unreadable body: {}>", e),
            Err(e) => {
                return Err(TurnError::NetworkFailed(format!(
                    "Failed to read response body: {}",
                    e
                )))
            }
        };

        if !status.is_success() {
            error!("Analysis service returned {}: {}", status, body);
            return Err(TurnError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Undecodable response body: {}", body);
            TurnError::MalformedResponse(e.to_string())
        })
    }
}
