//! Resolving a shared link back to its stored file.

use std::time::Duration;

use crate::client::ClientError;
use crate::share::{self, FileKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareView {
    Found {
        filename: String,
        kind: FileKind,
        /// Where the raw bytes download from.
        file_url: String,
        /// The link to hand out.
        share_url: String,
    },
    NotFound {
        message: String,
        home_url: String,
    },
}

impl ShareView {
    pub fn render(&self) -> String {
        match self {
            ShareView::Found {
                filename,
                share_url,
                ..
            } => share::render_shared(filename, share_url),
            ShareView::NotFound { message, .. } => share::render_not_found(message),
        }
    }
}

/// Pull the stored filename out of a shareable URL. A bare filename is
/// returned as-is.
pub fn filename_from_share_url(url: &str) -> Option<&str> {
    let name = match url.rsplit_once("/shared/") {
        Some((_, rest)) => rest,
        None if !url.contains('/') => url,
        None => return None,
    };
    let name = name.split(['?', '#']).next().unwrap_or(name);
    if name.is_empty() || name.contains('/') {
        None
    } else {
        Some(name)
    }
}

pub struct ShareViewer {
    client: reqwest::Client,
    base_url: String,
}

impl ShareViewer {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Probe the direct URL once with HEAD. The answer holds for the life of
    /// the returned view; there is no retry.
    pub async fn open(&self, filename: &str) -> ShareView {
        let file_url = format!("{}{}", self.base_url, share::direct_path(filename));
        let home_url = format!("{}/", self.base_url);

        let message = match self.client.head(&file_url).send().await {
            Ok(response) if response.status().is_success() => {
                return ShareView::Found {
                    filename: filename.to_string(),
                    kind: FileKind::from_filename(filename),
                    share_url: format!("{}{}", self.base_url, share::share_path(filename)),
                    file_url,
                };
            }
            Ok(response) => {
                tracing::debug!(filename, status = %response.status(), "Shared file probe failed");
                "File not found"
            }
            Err(e) => {
                tracing::debug!(filename, error = %e, "Shared file probe errored");
                "Could not access the file"
            }
        };

        ShareView::NotFound {
            message: message.to_string(),
            home_url,
        }
    }
}
