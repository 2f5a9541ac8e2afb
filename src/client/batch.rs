//! Pending-file batch: what the user has picked but not yet uploaded.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::client::notify::{Notification, Notifier};
use crate::share::FileKind;
use crate::upload::{self, Violation, MAX_FILE_SIZE};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Batch holds at most {max_files} files")]
    TooManyFiles { max_files: usize },
    #[error("{count} file(s) rejected before upload")]
    Rejected { count: usize },
    #[error("No pending file with id {0}")]
    NotFound(FileId),
}

/// Stable handle for a pending file, assigned when it joins the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

impl FileId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Previews
// ============================================================================

#[derive(Debug, Default)]
struct PreviewInner {
    next: AtomicU64,
    live: Mutex<HashMap<u64, Bytes>>,
}

/// In-memory previews addressed by `preview:<n>` URLs. A preview lives for
/// exactly as long as its [`PreviewHandle`].
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<PreviewInner>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, data: Bytes) -> PreviewHandle {
        let id = self.inner.next.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut live) = self.inner.live.lock() {
            live.insert(id, data);
        }
        PreviewHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id: u64 = url.strip_prefix("preview:")?.parse().ok()?;
        self.inner.live.lock().ok()?.get(&id).cloned()
    }

    /// Number of previews not yet released.
    pub fn live_count(&self) -> usize {
        self.inner.live.lock().map(|live| live.len()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    registry: Arc<PreviewInner>,
}

impl PreviewHandle {
    pub fn url(&self) -> String {
        format!("preview:{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.registry.live.lock() {
            live.remove(&self.id);
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// A file as picked by the user, before it joins a batch.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, declaring its type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, std::io::Error> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, mime_type, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug)]
pub struct PendingFile {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
    preview: Option<PreviewHandle>,
}

impl PendingFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }

    pub fn preview_url(&self) -> Option<String> {
        self.preview.as_ref().map(PreviewHandle::url)
    }
}

// ============================================================================
// Pre-filter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    TooLarge,
    InvalidType,
    TooManyFiles,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectionReason,
}

/// Advisory checks run on a drop before anything is added. The server
/// repeats the type and size checks authoritatively.
pub fn prefilter(files: &[SelectedFile], max_files: usize, max_size: u64) -> Vec<Rejection> {
    if files.len() > max_files {
        return files
            .iter()
            .map(|f| Rejection {
                file_name: f.name.clone(),
                reason: RejectionReason::TooManyFiles,
            })
            .collect();
    }

    files
        .iter()
        .filter_map(|f| {
            let reason = match upload::check(&f.mime_type, f.size(), max_size) {
                Ok(()) => return None,
                Err(Violation::InvalidType) => RejectionReason::InvalidType,
                Err(Violation::TooLarge) => RejectionReason::TooLarge,
            };
            Some(Rejection {
                file_name: f.name.clone(),
                reason,
            })
        })
        .collect()
}

// ============================================================================
// Batch
// ============================================================================

pub struct UploadBatch {
    max_files: usize,
    max_size: u64,
    entries: Vec<PendingFile>,
    next_id: u64,
    previews: PreviewRegistry,
    notifier: Arc<dyn Notifier>,
}

impl UploadBatch {
    pub fn new(max_files: usize, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            max_files,
            max_size: MAX_FILE_SIZE,
            entries: Vec::new(),
            next_id: 0,
            previews: PreviewRegistry::new(),
            notifier,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.entries
    }

    pub fn get(&self, id: FileId) -> Option<&PendingFile> {
        self.entries.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run the pre-filter over a drop and add it only if nothing was
    /// rejected. Each rejected file gets its own notice.
    pub fn drop_files(&mut self, files: Vec<SelectedFile>) -> Result<Vec<FileId>, BatchError> {
        let rejections = prefilter(&files, self.max_files, self.max_size);
        if !rejections.is_empty() {
            let count = rejections.len();
            for rejection in rejections {
                self.notifier.notify(Notification::Rejected {
                    file_name: rejection.file_name,
                    reason: rejection.reason,
                });
            }
            return Err(BatchError::Rejected { count });
        }
        self.add(files)
    }

    /// All or nothing: if the batch would exceed its limit, nothing is added.
    pub fn add(&mut self, files: Vec<SelectedFile>) -> Result<Vec<FileId>, BatchError> {
        if self.entries.len() + files.len() > self.max_files {
            self.notifier.notify(Notification::TooManyFiles {
                max_files: self.max_files,
            });
            return Err(BatchError::TooManyFiles {
                max_files: self.max_files,
            });
        }

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let id = FileId(self.next_id);
            self.next_id += 1;

            let preview = if FileKind::from_mime(&file.mime_type) == FileKind::Image {
                Some(self.previews.create(file.data.clone()))
            } else {
                None
            };

            self.entries.push(PendingFile {
                id,
                name: file.name,
                mime_type: file.mime_type,
                data: file.data,
                preview,
            });
            ids.push(id);
        }

        tracing::debug!(added = ids.len(), pending = self.entries.len(), "Files added to batch");
        Ok(ids)
    }

    /// Remove a file, releasing its preview. Later entries keep their order.
    pub fn remove(&mut self, id: FileId) -> Result<(), BatchError> {
        let index = self
            .entries
            .iter()
            .position(|f| f.id == id)
            .ok_or(BatchError::NotFound(id))?;
        self.entries.remove(index);
        Ok(())
    }

    /// Positional removal, for callers that track list rows.
    pub fn remove_at(&mut self, index: usize) -> Option<FileId> {
        if index >= self.entries.len() {
            return None;
        }
        Some(self.entries.remove(index).id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Human-readable byte count: `0 Bytes`, `500 Bytes`, `1.5 KB`, `10 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
