use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::object_store::{is_valid_key, ObjectStoreError};
use crate::AppState;

/// Serve stored file bytes. axum answers HEAD on this route too, which is
/// what the share viewer probes with.
/// Route: GET /uploads/:filename
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_valid_key(&filename) {
        return Err(ApiError::not_found("File not found"));
    }

    let data = state
        .object_store
        .get(&filename)
        .await
        .map_err(|e| match e {
            ObjectStoreError::NotFound(_) | ObjectStoreError::InvalidKey(_) => {
                ApiError::not_found("File not found")
            }
            _ => {
                tracing::error!(error = %e, filename = %filename, "Failed to read stored file");
                ApiError::internal("Failed to retrieve file")
            }
        })?;

    let byte_size = data.len() as u64;
    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    let mime_type = mime_guess::from_path(&filename).first_or_octet_stream();
    if let Ok(value) = mime_type.essence_str().parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(byte_size),
    );

    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Stored files are never rewritten
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok(response)
}
