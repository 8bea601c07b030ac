//! Capture sub-flow: idle → permission-requested → recording → stopped.
//!
//! A [`CaptureDevice`] stands in for the browser's media stream. The
//! [`Recorder`] collects the chunks it yields and, once stopped, hands
//! back a single [`Blob`] ready for upload.

use super::blob::Blob;
use super::error::ClientError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Default chunk size for [`StreamDevice`], 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[async_trait]
pub trait CaptureDevice: Send {
    /// Type of the media the device produces, e.g. `video/webm`.
    fn mime_type(&self) -> &str;

    /// Ask for access. A refusal is a [`ClientError::Permission`].
    async fn request_access(&mut self) -> Result<(), ClientError>;

    /// Next slice of recorded media, `None` once the device has ended.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError>;

    /// Release the device.
    async fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    PermissionRequested,
    Recording,
    Stopped,
}

pub struct Recorder<D> {
    device: D,
    state: RecorderState,
    chunks: Vec<Bytes>,
}

impl<D: CaptureDevice> Recorder<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            state: RecorderState::Idle,
            chunks: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Live preview is only attached while recording.
    pub fn preview_active(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn captured_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub async fn start(&mut self) -> Result<(), ClientError> {
        if !matches!(self.state, RecorderState::Idle | RecorderState::Stopped) {
            return Err(ClientError::InvalidState(format!(
                "cannot start recording while {:?}",
                self.state
            )));
        }

        self.state = RecorderState::PermissionRequested;
        if let Err(e) = self.device.request_access().await {
            tracing::warn!("Capture access refused: {}", e);
            self.state = RecorderState::Idle;
            return Err(e);
        }

        self.chunks.clear();
        self.state = RecorderState::Recording;
        tracing::info!("🎥 Recording started ({})", self.device.mime_type());
        Ok(())
    }

    /// Pull one chunk from the device. Returns `false` once it has ended.
    pub async fn capture(&mut self) -> Result<bool, ClientError> {
        self.expect_recording()?;
        match self.device.next_chunk().await? {
            Some(chunk) => {
                self.chunks.push(chunk);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop the device and assemble everything captured into one blob.
    pub async fn stop(&mut self) -> Result<Blob, ClientError> {
        self.expect_recording()?;
        self.device.stop().await;
        self.state = RecorderState::Stopped;

        let mut data = BytesMut::with_capacity(self.captured_bytes());
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }

        let mime_type = self.device.mime_type().to_string();
        let name = format!(
            "recording-{}.{}",
            Utc::now().timestamp_millis(),
            extension_for(&mime_type)
        );
        tracing::info!("⏹️  Recording stopped: {} ({} bytes)", name, data.len());

        Ok(Blob::new(name, mime_type, data.freeze()))
    }

    /// Start, capture until the device ends or `limit` elapses, then stop.
    /// A capture failure releases the device and discards what was captured.
    pub async fn record(&mut self, limit: Option<Duration>) -> Result<Blob, ClientError> {
        self.start().await?;

        let captured = match limit {
            Some(limit) => tokio::time::timeout(limit, self.capture_all())
                .await
                .unwrap_or(Ok(())),
            None => self.capture_all().await,
        };
        if let Err(e) = captured {
            self.abort(&e).await;
            return Err(e);
        }

        self.stop().await
    }

    async fn capture_all(&mut self) -> Result<(), ClientError> {
        while self.capture().await? {}
        Ok(())
    }

    async fn abort(&mut self, cause: &ClientError) {
        self.device.stop().await;
        self.chunks.clear();
        self.state = RecorderState::Stopped;
        tracing::warn!("⏹️  Recording aborted: {}", cause);
    }

    fn expect_recording(&self) -> Result<(), ClientError> {
        if self.state == RecorderState::Recording {
            Ok(())
        } else {
            Err(ClientError::InvalidState(format!(
                "recorder is {:?}, not recording",
                self.state
            )))
        }
    }
}

/// File extension for a recorded media type.
pub fn extension_for(mime_type: &str) -> &'static str {
    let Ok(parsed) = mime_type.parse::<mime::Mime>() else {
        return "bin";
    };
    match parsed.subtype().as_str() {
        "webm" => "webm",
        "mp4" => "mp4",
        "ogg" => "ogg",
        "wav" | "x-wav" => "wav",
        "mpeg" => "mp3",
        _ => "bin",
    }
}

/// Where a [`StreamDevice`] reads media from.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    Stdin,
    Path(PathBuf),
}

/// Reads already-encoded media from stdin or a file/pipe, e.g. the output
/// of an external capture tool.
pub struct StreamDevice {
    source: CaptureSource,
    mime_type: String,
    chunk_size: usize,
    reader: Option<Box<dyn AsyncRead + Unpin + Send>>,
}

impl StreamDevice {
    pub fn new(source: CaptureSource, mime_type: impl Into<String>) -> Self {
        Self {
            source,
            mime_type: mime_type.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            reader: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl CaptureDevice for StreamDevice {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn request_access(&mut self) -> Result<(), ClientError> {
        let reader: Box<dyn AsyncRead + Unpin + Send> = match &self.source {
            CaptureSource::Stdin => Box::new(tokio::io::stdin()),
            CaptureSource::Path(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
                    ErrorKind::PermissionDenied => {
                        ClientError::Permission(format!("{}: {}", path.display(), e))
                    }
                    _ => ClientError::Source(format!(
                        "Capture source {} unavailable: {}",
                        path.display(),
                        e
                    )),
                })?;
                Box::new(file)
            }
        };
        self.reader = Some(reader);
        Ok(())
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut buf = BytesMut::with_capacity(self.chunk_size);
        let n = reader
            .take(self.chunk_size as u64)
            .read_buf(&mut buf)
            .await
            .map_err(|e| ClientError::Source(format!("Capture read failed: {}", e)))?;

        if n == 0 {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }

    async fn stop(&mut self) {
        self.reader = None;
    }
}
