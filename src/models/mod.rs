use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const HEALTH_MESSAGE: &str = "Server is healthy and ready to receive blob uploads";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

/// ISO-8601 UTC with millisecond precision, e.g. `2026-10-17T09:30:00.123Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub message: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: iso_timestamp(Utc::now()),
            message: HEALTH_MESSAGE.to_string(),
        }
    }
}

/// Metadata for one stored upload. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// `<epoch-millis>-<original name>`
    pub filename: String,
    /// Bytes on disk after the write completed
    pub size: u64,
    /// Content type declared by the client, not verified
    pub mimetype: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file: UploadedFile,
}

impl UploadResponse {
    pub fn stored(file: UploadedFile) -> Self {
        Self {
            success: true,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            file,
        }
    }
}

/// Shape of every error body the receiver emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
