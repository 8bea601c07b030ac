use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use blob_upload_debug::config::ServerConfig;
use blob_upload_debug::services::storage::{StorageError, StorageService, StoredFile};
use blob_upload_debug::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncRead;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    fn file(filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name: "file",
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn setup_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::development(dir.path().join("uploads"));
    (create_app(AppState::new(config)), dir)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn stored_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("uploads"))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn is_stored_name(filename: &str, original: &str) -> bool {
    filename
        .strip_suffix(original)
        .and_then(|prefix| prefix.strip_suffix('-'))
        .is_some_and(|millis| !millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()))
}

#[tokio::test]
async fn test_health_check() {
    let (app, _dir) = setup_app();

    let (status, json) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(
        json["message"],
        "Server is healthy and ready to receive blob uploads"
    );
    let timestamp = json["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_upload_ten_byte_text_file() {
    let (app, dir) = setup_app();

    let (status, json) = send(
        app,
        upload_request(&[Part::file("a.txt", "text/plain", b"0123456789")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "File uploaded successfully");

    let filename = json["file"]["filename"].as_str().unwrap();
    assert!(is_stored_name(filename, "a.txt"), "{}", filename);
    assert_eq!(json["file"]["size"], 10);
    assert_eq!(json["file"]["mimetype"], "text/plain");
    assert!(json["file"]["uploadedAt"].as_str().unwrap().ends_with('Z'));

    let on_disk = std::fs::read(dir.path().join("uploads").join(filename)).unwrap();
    assert_eq!(on_disk, b"0123456789");
}

#[tokio::test]
async fn test_size_matches_binary_content() {
    let (app, _dir) = setup_app();
    let data: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();

    let (status, json) = send(
        app,
        upload_request(&[Part::file("clip.webm", "video/webm", &data)]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"]["size"], 70_000);
    assert_eq!(json["file"]["mimetype"], "video/webm");
}

#[tokio::test]
async fn test_no_file_part_is_rejected() {
    let (app, dir) = setup_app();

    let (status, json) = send(app, upload_request(&[Part::text("note", "hello")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({ "error": "No file provided" }));
    assert!(stored_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_non_multipart_request_is_rejected() {
    let (app, _dir) = setup_app();

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"nope"}"#))
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file provided");
}

#[tokio::test]
async fn test_same_name_uploads_create_distinct_files() {
    let (app, dir) = setup_app();

    let (_, first) = send(
        app.clone(),
        upload_request(&[Part::file("same.txt", "text/plain", b"one")]),
    )
    .await;
    let (_, second) = send(
        app,
        upload_request(&[Part::file("same.txt", "text/plain", b"one")]),
    )
    .await;

    let first = first["file"]["filename"].as_str().unwrap();
    let second = second["file"]["filename"].as_str().unwrap();
    assert_ne!(first, second);
    assert!(first.ends_with("same.txt"));
    assert!(second.ends_with("same.txt"));
    assert_eq!(stored_files(dir.path()).len(), 2);
}

#[tokio::test]
async fn test_first_file_part_wins() {
    let (app, dir) = setup_app();

    let (status, json) = send(
        app,
        upload_request(&[
            Part::text("description", "ignored"),
            Part::file("first.bin", "application/octet-stream", b"first"),
            Part::file("second.bin", "application/octet-stream", b"second"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let filename = json["file"]["filename"].as_str().unwrap();
    assert!(is_stored_name(filename, "first.bin"));
    assert_eq!(json["file"]["size"], 5);
    assert_eq!(stored_files(dir.path()), vec![filename.to_string()]);
}

#[tokio::test]
async fn test_field_name_does_not_matter() {
    let (app, _dir) = setup_app();

    let part = Part {
        name: "video",
        filename: Some("rec.webm"),
        content_type: Some("video/webm"),
        data: b"webm",
    };
    let (status, json) = send(app, upload_request(&[part])).await;

    assert_eq!(status, StatusCode::OK);
    assert!(is_stored_name(json["file"]["filename"].as_str().unwrap(), "rec.webm"));
}

#[tokio::test]
async fn test_missing_filename_uses_default_name() {
    let (app, _dir) = setup_app();

    let (status, json) = send(
        app,
        upload_request(&[Part::file("", "application/octet-stream", b"blob")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(is_stored_name(
        json["file"]["filename"].as_str().unwrap(),
        "blob-file"
    ));
}

#[tokio::test]
async fn test_missing_content_type_reports_text_plain() {
    let (app, _dir) = setup_app();

    let part = Part {
        name: "file",
        filename: Some("raw.dat"),
        content_type: None,
        data: b"raw",
    };
    let (status, json) = send(app, upload_request(&[part])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["file"]["mimetype"], "text/plain");
}

#[tokio::test]
async fn test_path_components_are_stripped() {
    let (app, dir) = setup_app();

    let (status, json) = send(
        app,
        upload_request(&[Part::file("../../escape.txt", "text/plain", b"x")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let filename = json["file"]["filename"].as_str().unwrap();
    assert!(is_stored_name(filename, "escape.txt"));
    assert_eq!(stored_files(dir.path()), vec![filename.to_string()]);
    assert!(!dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_oversized_file_is_rejected_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::development(dir.path().join("uploads"));
    config.max_file_size = 16;
    let app = create_app(AppState::new(config));

    let (status, json) = send(
        app,
        upload_request(&[Part::file("big.bin", "application/octet-stream", &[1u8; 32])]),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"], "File too large");
    assert!(stored_files(dir.path()).is_empty());
}

struct FailingStorage;

#[async_trait]
impl StorageService for FailingStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store_stream<'a>(
        &self,
        _name: &str,
        _reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredFile, StorageError> {
        Err(StorageError::Io(std::io::Error::other("No space left on device")))
    }
}

struct PanickingStorage;

#[async_trait]
impl StorageService for PanickingStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn store_stream<'a>(
        &self,
        _name: &str,
        _reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<StoredFile, StorageError> {
        panic!("storage backend exploded");
    }
}

fn app_with_storage(storage: Arc<dyn StorageService>) -> Router {
    create_app(AppState {
        storage,
        config: ServerConfig::development("unused"),
    })
}

#[tokio::test]
async fn test_write_failure_returns_upload_failed() {
    let app = app_with_storage(Arc::new(FailingStorage));

    let (status, json) = send(
        app,
        upload_request(&[Part::file("a.txt", "text/plain", b"0123456789")]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Upload failed");
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("No space left on device")
    );
}

#[tokio::test]
async fn test_panic_returns_internal_server_error() {
    let app = app_with_storage(Arc::new(PanickingStorage));

    let (status, json) = send(
        app,
        upload_request(&[Part::file("a.txt", "text/plain", b"0123456789")]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(json["message"], "storage backend exploded");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _dir) = setup_app();

    let (status, json) = send(
        app,
        Request::builder().uri("/nope").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Not found");
    assert_eq!(json["message"], "Route GET:/nope not found");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _dir) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "probe-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "probe-42");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let (app, _dir) = setup_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_cors_reflects_origin_with_credentials() {
    let (app, _dir) = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/upload")
                .header(header::ORIGIN, "http://192.168.1.20:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://192.168.1.20:5173"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_openapi_document_lists_endpoints() {
    let (app, _dir) = setup_app();

    let (status, json) = send(
        app,
        Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/health"].is_object());
    assert!(json["paths"]["/upload"].is_object());
}
