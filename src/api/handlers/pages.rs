use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

use super::request_host;
use crate::csrf::CsrfToken;
use crate::object_store::is_valid_key;
use crate::share;
use crate::AppState;

/// Uploader page with a freshly issued CSRF token.
/// Route: GET /
pub async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    let token = CsrfToken::issue();
    Html(share::render_home(&token, state.config.max_files))
}

/// Share view for a stored file.
/// Route: GET /shared/:filename
pub async fn shared_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Response {
    let exists = if is_valid_key(&filename) {
        match state.object_store.exists(&filename).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, filename = %filename, "Existence check failed");
                return (
                    StatusCode::NOT_FOUND,
                    Html(share::render_not_found("Could not access the file")),
                )
                    .into_response();
            }
        }
    } else {
        false
    };

    if !exists {
        return (
            StatusCode::NOT_FOUND,
            Html(share::render_not_found("File not found")),
        )
            .into_response();
    }

    let host = request_host(&headers, &state.config);
    let share_url = format!(
        "{}://{host}{}",
        state.config.environment.scheme(),
        share::share_path(&filename)
    );

    Html(share::render_shared(&filename, &share_url)).into_response()
}
