use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

use super::request_host;
use crate::api::response::ApiError;
use crate::csrf::{tokens_match, CSRF_FORM_FIELD, CSRF_HEADER};
use crate::upload::{self, FileUrls, UploadResponse};
use crate::AppState;

/// The `file` part of an upload, as submitted.
struct SubmittedFile {
    name: String,
    content_type: Option<String>,
    /// At most `max_upload_size` bytes; anything past that is counted, not kept.
    data: Bytes,
    size: u64,
    /// The request body limit cut the part off before its end.
    truncated: bool,
}

impl SubmittedFile {
    /// Size to validate against the limit. A truncated part is known to be
    /// larger than anything we were willing to read.
    fn checked_size(&self, max_upload_size: u64) -> u64 {
        if self.truncated {
            self.size.max(max_upload_size.saturating_add(1))
        } else {
            self.size
        }
    }
}

fn body_limit_hit(e: &MultipartError) -> bool {
    e.status() == StatusCode::PAYLOAD_TOO_LARGE
}

/// Accept a single file.
/// Route: POST /api/upload
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let max_upload_size = state.config.max_upload_size;
    let mut form_token: Option<String> = None;
    let mut file: Option<SubmittedFile> = None;

    // Fields may arrive in any order, so collect everything before validating.
    // Hitting the body limit ends collection; validation still runs in order
    // on whatever was read.
    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if body_limit_hit(&e) => break,
            Err(e) => return Err(ApiError::bad_request(format!("Invalid multipart data: {e}"))),
        };
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let mut data = BytesMut::new();
                let mut size: u64 = 0;
                let mut truncated = false;

                loop {
                    match field.chunk().await {
                        Ok(Some(chunk)) => {
                            size += chunk.len() as u64;
                            if size <= max_upload_size {
                                data.extend_from_slice(&chunk);
                            }
                        }
                        Ok(None) => break,
                        Err(e) if body_limit_hit(&e) => {
                            truncated = true;
                            break;
                        }
                        Err(e) => {
                            return Err(ApiError::bad_request(format!("Failed to read file: {e}")))
                        }
                    }
                }

                file = Some(SubmittedFile {
                    name,
                    content_type,
                    data: data.freeze(),
                    size,
                    truncated,
                });
                if truncated {
                    break;
                }
            }
            CSRF_FORM_FIELD => match field.text().await {
                Ok(text) => form_token = Some(text),
                Err(e) if body_limit_hit(&e) => break,
                Err(e) => return Err(ApiError::bad_request(format!("Invalid csrfToken: {e}"))),
            },
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let header_token = headers
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());
    if !tokens_match(header_token, form_token.as_deref()) {
        tracing::warn!("Rejected upload with invalid or missing CSRF token");
        return Err(ApiError::forbidden("Invalid or missing CSRF token"));
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let file_size = file.checked_size(max_upload_size);
    let file_type = file.content_type.unwrap_or_default();
    if let Err(violation) = upload::check(&file_type, file_size, max_upload_size) {
        tracing::debug!(
            file_name = %file.name,
            file_type = %file_type,
            file_size,
            ?violation,
            "Rejected upload"
        );
        return Err(ApiError::bad_request(violation.message()));
    }

    let unique_filename = upload::unique_filename(&file.name);

    if let Err(e) = state.object_store.put(&unique_filename, file.data).await {
        tracing::error!(
            error = %e,
            unique_filename = %unique_filename,
            "Upload error"
        );
        return Err(ApiError::internal("Failed to upload file"));
    }

    let host = request_host(&headers, &state.config);
    let urls = FileUrls::new(state.config.environment, host, &unique_filename);

    tracing::info!(
        file_name = %file.name,
        unique_filename = %unique_filename,
        file_url = %urls.direct,
        shareable_url = %urls.shareable,
        "File uploaded successfully"
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully".to_string(),
        file_name: file.name,
        file_size,
        file_type,
        file_url: urls.direct,
        shareable_url: urls.shareable,
        unique_filename,
    }))
}
