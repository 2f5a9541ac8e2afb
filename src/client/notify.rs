//! User-facing notices raised by the client layer.

use std::sync::Mutex;

use crate::client::batch::RejectionReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A dropped file failed the client-side pre-filter.
    Rejected {
        file_name: String,
        reason: RejectionReason,
    },
    /// An add would have pushed the batch over its file limit.
    TooManyFiles { max_files: usize },
    /// Upload was requested with nothing selected.
    EmptyBatch,
    /// One file finished uploading; the shareable URL is offered for copying.
    Uploaded {
        file_name: String,
        file_url: String,
        shareable_url: String,
    },
    /// Every file in the batch uploaded.
    AllUploaded { count: usize },
}

impl Notification {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Notification::Rejected { .. } | Notification::TooManyFiles { .. } | Notification::EmptyBatch
        )
    }

    /// Text that goes to copy-to-clipboard actions, if any.
    pub fn copy_text(&self) -> Option<&str> {
        match self {
            Notification::Uploaded { shareable_url, .. } => Some(shareable_url.as_str()),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notification::Rejected { file_name, reason } => match reason {
                RejectionReason::TooLarge => format!("\"{file_name}\" is too large (max: 10MB)"),
                RejectionReason::InvalidType => {
                    format!("\"{file_name}\" is not an accepted file type (jpg, png, pdf)")
                }
                RejectionReason::TooManyFiles => format!("\"{file_name}\": Too many files"),
            },
            Notification::TooManyFiles { max_files } => {
                format!("You can only upload a maximum of {max_files} files")
            }
            Notification::EmptyBatch => "Please select at least one file to upload".to_string(),
            Notification::Uploaded { file_name, .. } => {
                format!("\"{file_name}\" uploaded successfully")
            }
            Notification::AllUploaded { count } => {
                let plural = if *count == 1 { "" } else { "s" };
                format!("Successfully uploaded {count} file{plural}")
            }
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notices to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            tracing::warn!("{}", notification.message());
        } else if let Some(link) = notification.copy_text() {
            tracing::info!(link = %link, "{}", notification.message());
        } else {
            tracing::info!("{}", notification.message());
        }
    }
}

/// Keeps every notice in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn take(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|mut n| std::mem::take(&mut *n))
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}
