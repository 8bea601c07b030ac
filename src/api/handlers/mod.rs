pub mod health;
pub mod upload;

use crate::api::error::AppError;
use axum::http::{Method, Uri};

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::NotFound(format!("Route {}:{} not found", method, uri.path()))
}
