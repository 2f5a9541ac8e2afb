mod health;
mod pages;
mod upload;
mod uploads;

pub use health::health;
pub use pages::{home, shared_file};
pub use upload::upload_file;
pub use uploads::serve_upload;

use axum::http::{header, HeaderMap};

use crate::config::Config;

/// Host to build absolute URLs with: the request's `Host` header, or the
/// configured default when it is missing or empty.
pub(crate) fn request_host<'a>(headers: &'a HeaderMap, config: &'a Config) -> &'a str {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|host| !host.is_empty())
        .unwrap_or(config.node.default_host.as_str())
}
