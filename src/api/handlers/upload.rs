use crate::AppState;
use crate::api::error::AppError;
use crate::models::{UploadResponse, UploadedFile, iso_timestamp};
use crate::utils::validation::sanitize_filename;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use chrono::Utc;
use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

/// Reported for file parts that carry no Content-Type of their own.
pub const DEFAULT_PART_MIME: &str = "text/plain";

/// Multipart body accepted by `/upload`. The field name is not checked:
/// the first part with a filename is the one stored.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(format = Binary)]
    file: String,
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file part in the request", body = ErrorResponse),
        (status = 413, description = "File part over the size limit", body = ErrorResponse),
        (status = 500, description = "Write to disk failed", body = ErrorResponse)
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!("Upload without a multipart body: {}", rejection.body_text());
            return Err(AppError::NoFile);
        }
    };

    tracing::info!("Upload request received");
    let result = store_first_file(&state, &mut multipart).await;

    if let Err(e) = &result {
        tracing::warn!("Upload failed early: {}. Consuming remaining stream...", e);
    }
    // Read the rest of the body so the client gets our response instead of
    // a connection reset.
    drain(&mut multipart).await;

    result.map(Json)
}

async fn store_first_file(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<UploadResponse, AppError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(original_filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let mimetype = field
            .content_type()
            .unwrap_or(DEFAULT_PART_MIME)
            .to_string();

        tracing::info!(
            field = field.name().unwrap_or_default(),
            filename = %original_filename,
            mimetype = %mimetype,
            "File details"
        );

        let name = sanitize_filename(&original_filename);
        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let stored = state.storage.store_stream(&name, Box::new(reader)).await?;

        tracing::info!(
            "File uploaded successfully: {} ({} bytes)",
            stored.filename,
            stored.size
        );

        return Ok(UploadResponse::stored(UploadedFile {
            filename: stored.filename,
            size: stored.size,
            mimetype,
            uploaded_at: iso_timestamp(Utc::now()),
        }));
    }

    Err(AppError::NoFile)
}

async fn drain(multipart: &mut Multipart) {
    while let Ok(Some(mut field)) = multipart.next_field().await {
        while let Ok(Some(_)) = field.chunk().await {}
    }
}
