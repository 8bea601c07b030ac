//! Native stand-in for the browser harness: checks liveness, gathers a
//! blob from a file, a URL or a capture device, and posts it to `/upload`.

pub mod blob;
pub mod error;
pub mod recording;
pub mod state;

pub use blob::Blob;
pub use error::ClientError;
pub use recording::{CaptureDevice, CaptureSource, Recorder, RecorderState, StreamDevice};
pub use state::UploadState;

use crate::config::ClientConfig;
use crate::models::{HealthResponse, UploadResponse, UploadedFile};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

/// Multipart field name the harness sends the payload under.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        tracing::debug!("Checking server health at {}", url);
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    pub async fn upload(&self, blob: &Blob) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(blob.data.to_vec())
            .file_name(blob.name.clone())
            .mime_str(&blob.mime_type)
            .map_err(|e| ClientError::Request(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let url = format!("{}/upload", self.base_url);
        tracing::info!(
            "📤 Uploading {} ({} bytes, {}) to {}",
            blob.name,
            blob.len(),
            blob.mime_type,
            url
        );

        let response = self.http.post(url).multipart(form).send().await?;
        read_json(response).await
    }

    /// Fetch `url` into a blob, sharing this client's timeout.
    pub async fn fetch_blob(&self, url: &str, name: &str) -> Result<Blob, ClientError> {
        Blob::from_url(&self.http, url, name).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::from_response(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Server {
        status: status.as_u16(),
        message: format!("Unreadable response body: {}", e),
    })
}

/// Drives [`UploadState`] through real requests.
pub struct UploadSession {
    client: UploadClient,
    state: UploadState,
}

impl UploadSession {
    pub fn new(client: UploadClient) -> Self {
        Self {
            client,
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn client(&self) -> &UploadClient {
        &self.client
    }

    pub fn select(&mut self, blob: Blob) -> Result<(), ClientError> {
        self.state.select(blob)
    }

    pub async fn select_path(&mut self, path: &Path) -> Result<(), ClientError> {
        let produced = Blob::from_path(path).await;
        self.settle_selection(produced)
    }

    pub async fn select_url(&mut self, url: &str, name: &str) -> Result<(), ClientError> {
        let produced = self.client.fetch_blob(url, name).await;
        self.settle_selection(produced)
    }

    /// Send the selected blob. The outcome is also left in [`Self::state`].
    pub async fn upload(&mut self) -> Result<UploadedFile, ClientError> {
        let blob = self.state.begin_upload()?;
        let outcome = self.client.upload(&blob).await;

        match &outcome {
            Ok(response) => tracing::info!("✅ Upload successful: {}", response.file.filename),
            Err(e) => tracing::error!("❌ Upload failed: {}", e),
        }

        let result = outcome
            .as_ref()
            .map(|r| r.file.clone())
            .map_err(Clone::clone);
        self.state.finish(outcome)?;
        result
    }

    /// Record until the device ends or `limit` elapses, then upload the
    /// recording straight away.
    pub async fn record_and_upload<D: CaptureDevice>(
        &mut self,
        recorder: &mut Recorder<D>,
        limit: Option<Duration>,
    ) -> Result<UploadedFile, ClientError> {
        let produced = recorder.record(limit).await;
        self.settle_selection(produced)?;
        self.upload().await
    }

    fn settle_selection(&mut self, produced: Result<Blob, ClientError>) -> Result<(), ClientError> {
        match produced {
            Ok(blob) => self.state.select(blob),
            Err(e) => {
                self.state.fail(e.clone())?;
                Err(e)
            }
        }
    }
}
