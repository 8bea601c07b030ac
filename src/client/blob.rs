use super::error::ClientError;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::path::Path;

/// Filename given to blobs fetched from a URL when the caller has none.
pub const DEFAULT_URL_BLOB_NAME: &str = "sample-image.png";

/// An in-memory payload plus the filename it is uploaded under.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl Blob {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read a local file. The type is sniffed from its leading bytes.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            ClientError::Source(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let mime_type = sniff_mime(&data);

        tracing::info!(
            name = %name,
            size = data.len(),
            mime_type = %mime_type,
            "File selected"
        );

        Ok(Self::new(name, mime_type, data))
    }

    /// GET `url` into memory. The blob takes the response's declared
    /// Content-Type, or a sniffed one when the header is missing.
    ///
    /// A non-2xx response is a [`ClientError::Source`] rather than a blob
    /// holding the error page, so a broken URL never reaches `/upload`.
    pub async fn from_url(
        http: &reqwest::Client,
        url: &str,
        name: &str,
    ) -> Result<Self, ClientError> {
        let failed = |detail: String| {
            ClientError::Source(format!("Failed to create blob from URL: {}", detail))
        };

        let response = http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await.map_err(|e| failed(e.to_string()))?;
        let mime_type = declared.unwrap_or_else(|| sniff_mime(&data));

        tracing::info!(
            url = %url,
            size = data.len(),
            mime_type = %mime_type,
            "Blob created from URL"
        );

        Ok(Self::new(name, mime_type, data))
    }
}

/// Best guess from magic bytes, `application/octet-stream` otherwise.
pub fn sniff_mime(data: &[u8]) -> String {
    infer::get(data)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}
