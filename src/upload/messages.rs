use serde::{Deserialize, Serialize};

/// Answer returned by `POST /vision`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub answer: String,
    /// Base64-encoded synthesized speech; absent for a text-only answer
    #[serde(rename = "audio_base64", default, skip_serializing_if = "Option::is_none")]
    pub audio_payload: Option<String>,
}

impl AnalysisResponse {
    pub fn is_text_only(&self) -> bool {
        self.audio_payload.is_none()
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    /// Server-local timestamp, passed through as sent
    pub timestamp: String,
    pub message: String,
}
