use crate::models::ErrorResponse;
use crate::services::storage::StorageError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::any::Any;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file provided")]
    NoFile,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    fn parts(self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            AppError::NoFile => (StatusCode::BAD_REQUEST, "No file provided", None),
            AppError::UploadFailed(msg) => {
                tracing::error!("Upload error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Upload failed", Some(msg))
            }
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "File too large", Some(msg))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg)),
            AppError::Internal(msg) => {
                tracing::error!("Server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    Some(msg),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(e.body_text())
        } else {
            AppError::UploadFailed(e.body_text())
        }
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            StorageError::Io(io) => {
                // Multipart read failures reach storage wrapped in io::Error.
                let multipart = io
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>());
                match multipart {
                    Some(m) if m.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                        AppError::PayloadTooLarge(m.body_text())
                    }
                    _ => AppError::UploadFailed(io.to_string()),
                }
            }
            StorageError::NameExhausted(_) => AppError::UploadFailed(e.to_string()),
        }
    }
}

/// Turns a handler panic into the generic 500 body.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    AppError::Internal(detail).into_response()
}
