//! Client side of the upload flow: what the browser page does, as a library.

pub mod batch;
pub mod notify;
pub mod transport;
pub mod viewer;

pub use batch::{
    format_size, prefilter, BatchError, FileId, PendingFile, PreviewRegistry, Rejection,
    RejectionReason, SelectedFile, UploadBatch,
};
pub use notify::{LogNotifier, MemoryNotifier, Notification, Notifier};
pub use transport::{UploadReport, UploadState, UploadTask, UploadTracker, Uploader};
pub use viewer::{ShareView, ShareViewer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No CSRF token found in page at {0}")]
    MissingToken(String),
}
