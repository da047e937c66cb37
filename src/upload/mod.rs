pub mod client;
pub mod messages;

pub use client::UploadClient;
pub use messages::{AnalysisResponse, HealthStatus};
