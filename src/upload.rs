//! Upload policy shared by the endpoint and the client pre-filter.

use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

pub const INVALID_TYPE_MESSAGE: &str = "File type not allowed. Allowed types: JPEG, PNG, PDF";
pub const TOO_LARGE_MESSAGE: &str = "File size exceeds the 10MB limit";

pub fn is_accepted_type(mime_type: &str) -> bool {
    ACCEPTED_MIME_TYPES.contains(&mime_type)
}

/// Why a file is refused, checked in this order: type, then size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    InvalidType,
    TooLarge,
}

impl Violation {
    pub fn message(self) -> &'static str {
        match self {
            Violation::InvalidType => INVALID_TYPE_MESSAGE,
            Violation::TooLarge => TOO_LARGE_MESSAGE,
        }
    }
}

pub fn check(mime_type: &str, byte_size: u64, max_size: u64) -> Result<(), Violation> {
    if !is_accepted_type(mime_type) {
        return Err(Violation::InvalidType);
    }
    if byte_size > max_size {
        return Err(Violation::TooLarge);
    }
    Ok(())
}

/// Extension of a submitted filename: whatever follows the last `.`.
/// Anything that is not plain ASCII alphanumerics is dropped.
pub fn extension_of(file_name: &str) -> Option<&str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// Fresh collision-resistant name for a stored file: `{uuid}.{ext}`.
pub fn unique_filename(original_name: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match extension_of(original_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Public URLs for a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUrls {
    pub direct: String,
    pub shareable: String,
}

impl FileUrls {
    pub fn new(environment: Environment, host: &str, unique_filename: &str) -> Self {
        let scheme = environment.scheme();
        Self {
            direct: format!("{scheme}://{host}/uploads/{unique_filename}"),
            shareable: format!("{scheme}://{host}/shared/{unique_filename}"),
        }
    }
}

/// Body returned by `POST /api/upload` on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub file_url: String,
    pub shareable_url: String,
    pub unique_filename: String,
}
