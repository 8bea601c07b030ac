use super::blob::Blob;
use super::error::ClientError;
use crate::models::{UploadResponse, UploadedFile};
use std::fmt;

/// One upload attempt. Exactly one of these holds at any time, so a result
/// and an error can never be shown together.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Selecting(Blob),
    Uploading(Blob),
    Succeeded(UploadedFile),
    Failed(ClientError),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Selecting(_) => "selecting",
            UploadState::Uploading(_) => "uploading",
            UploadState::Succeeded(_) => "succeeded",
            UploadState::Failed(_) => "failed",
        }
    }

    /// Pick a new payload. Clears any earlier result or error.
    pub fn select(&mut self, blob: Blob) -> Result<(), ClientError> {
        self.ensure_not_uploading("select a new blob")?;
        *self = UploadState::Selecting(blob);
        Ok(())
    }

    /// A payload could not be produced.
    pub fn fail(&mut self, error: ClientError) -> Result<(), ClientError> {
        self.ensure_not_uploading("record a selection failure")?;
        *self = UploadState::Failed(error);
        Ok(())
    }

    /// Move the selected blob into flight and return it for sending.
    pub fn begin_upload(&mut self) -> Result<Blob, ClientError> {
        match std::mem::take(self) {
            UploadState::Selecting(blob) => {
                *self = UploadState::Uploading(blob.clone());
                Ok(blob)
            }
            other => {
                let err = ClientError::InvalidState(format!(
                    "nothing selected to upload (state: {})",
                    other.name()
                ));
                *self = other;
                Err(err)
            }
        }
    }

    /// Record the outcome of the in-flight upload.
    pub fn finish(
        &mut self,
        outcome: Result<UploadResponse, ClientError>,
    ) -> Result<(), ClientError> {
        if !matches!(self, UploadState::Uploading(_)) {
            return Err(ClientError::InvalidState(format!(
                "no upload in flight (state: {})",
                self.name()
            )));
        }

        *self = match outcome {
            Ok(response) => UploadState::Succeeded(response.file),
            Err(e) => UploadState::Failed(e),
        };
        Ok(())
    }

    fn ensure_not_uploading(&self, action: &str) -> Result<(), ClientError> {
        if let UploadState::Uploading(_) = self {
            return Err(ClientError::InvalidState(format!(
                "cannot {} while an upload is in flight",
                action
            )));
        }
        Ok(())
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Idle => write!(f, "Nothing selected"),
            UploadState::Selecting(blob) => write!(
                f,
                "Selected: {} ({:.2} KB, {})",
                blob.name,
                blob.len() as f64 / 1024.0,
                blob.mime_type
            ),
            UploadState::Uploading(blob) => write!(f, "Uploading {}...", blob.name),
            UploadState::Succeeded(file) => write!(
                f,
                "✅ Upload Successful!\n  Filename: {}\n  Size: {} bytes\n  Type: {}\n  Uploaded: {}",
                file.filename, file.size, file.mimetype, file.uploaded_at
            ),
            UploadState::Failed(e) => write!(f, "❌ Upload Failed! [{}] {}", e.category(), e),
        }
    }
}
