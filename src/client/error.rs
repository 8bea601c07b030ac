use crate::models::ErrorResponse;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a client-side step failed, classified the way the harness reports it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Nothing listening, connection refused or reset, DNS failure.
    #[error("Network Error - server unreachable: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("Server Error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The request went out but no response came back in time.
    #[error("No response from server - check if server is running ({0})")]
    NoResponse(String),

    /// The request could not be built.
    #[error("Request setup error: {0}")]
    Request(String),

    /// The capture device refused access.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// The payload could not be produced (unreadable file, failed fetch).
    #[error("{0}")]
    Source(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ClientError {
    /// Build a `Server` error from a non-2xx status and its body. The
    /// body's `message` wins over its `error`; a body that is not JSON
    /// falls back to the status reason.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
        let message = parsed
            .and_then(|b| b.message.or(Some(b.error)))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown status")
                    .to_string()
            });

        ClientError::Server { status, message }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ClientError::Network(_) => "network",
            ClientError::Server { .. } => "server",
            ClientError::NoResponse(_) => "no-response",
            ClientError::Request(_) => "request",
            ClientError::Permission(_) => "permission",
            ClientError::Source(_) => "source",
            ClientError::InvalidState(_) => "state",
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ClientError::Request(e.to_string())
        } else if e.is_timeout() {
            ClientError::NoResponse(e.to_string())
        } else if e.is_connect() {
            ClientError::Network(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Server {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ClientError::NoResponse(e.to_string())
        }
    }
}
