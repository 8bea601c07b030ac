use crate::utils::validation::stored_filename;
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("No free filename for {0}")]
    NameExhausted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of a completed write.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Create the destination if it is missing. Idempotent.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    /// Stream `reader` into a new file derived from `name` and report its
    /// final size. Nothing is left on disk when this returns an error.
    async fn store_stream<'a>(
        &self,
        name: &str,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredFile, StorageError>;
}

/// Flat directory of `<epoch-millis>-<name>` files.
pub struct LocalStorageService {
    root: PathBuf,
    max_file_size: u64,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            max_file_size: max_file_size as u64,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a file that did not exist before. A name already taken (same
    /// millisecond, same original name) gets a random suffix instead of
    /// being overwritten.
    async fn create_unique(
        &self,
        epoch_millis: i64,
        name: &str,
    ) -> Result<(String, PathBuf, File), StorageError> {
        let mut filename = stored_filename(epoch_millis, name, None);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.root.join(&filename);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((filename, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let suffix = Uuid::new_v4().simple().to_string();
                    let retry = stored_filename(epoch_millis, name, Some(&suffix[..8]));
                    tracing::warn!("{} already exists, retrying as {}", filename, retry);
                    filename = retry;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::NameExhausted(name.to_string()))
    }
}

/// Copy at most `limit` bytes into `file`. The handle is consumed so it is
/// closed whichever way this returns.
async fn write_capped<R>(mut file: File, reader: R, limit: u64) -> Result<u64, StorageError>
where
    R: AsyncRead + Unpin,
{
    let mut capped = reader.take(limit.saturating_add(1));
    let written = tokio::io::copy(&mut capped, &mut file).await?;
    if written > limit {
        return Err(StorageError::TooLarge { limit });
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn store_stream<'a>(
        &self,
        name: &str,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredFile, StorageError> {
        self.ensure_ready().await?;

        let epoch_millis = Utc::now().timestamp_millis();
        let (filename, path, file) = self.create_unique(epoch_millis, name).await?;

        if let Err(e) = write_capped(file, reader, self.max_file_size).await {
            if let Err(rm) = fs::remove_file(&path).await {
                tracing::warn!("Failed to remove partial upload {}: {}", path.display(), rm);
            }
            return Err(e);
        }

        let size = fs::metadata(&path).await?.len();
        tracing::info!("Stored {} ({} bytes) at {}", filename, size, path.display());

        Ok(StoredFile {
            filename,
            path,
            size,
        })
    }
}
