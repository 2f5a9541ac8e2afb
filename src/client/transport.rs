//! Concurrent per-file uploads with progress tracking.

use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::task::JoinSet;
use tokio_util::io::ReaderStream;

use crate::client::batch::{FileId, UploadBatch};
use crate::client::notify::{Notification, Notifier};
use crate::client::ClientError;
use crate::csrf::{CsrfToken, CSRF_FORM_FIELD, CSRF_HEADER};
use crate::upload::UploadResponse;

const CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Task bookkeeping
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Pending,
    Uploading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub id: FileId,
    pub file_name: String,
    /// Percentage in `0..=100`.
    pub progress: u8,
    pub state: UploadState,
    pub error: Option<String>,
    pub file_url: Option<String>,
    pub shareable_url: Option<String>,
}

impl UploadTask {
    pub fn new(id: FileId, file_name: impl Into<String>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            progress: 0,
            state: UploadState::Pending,
            error: None,
            file_url: None,
            shareable_url: None,
        }
    }

    pub fn start(&mut self) -> bool {
        if self.state != UploadState::Pending {
            return false;
        }
        self.state = UploadState::Uploading;
        true
    }

    /// Progress only moves forward, and only while uploading.
    pub fn set_progress(&mut self, percent: u8) {
        if self.state == UploadState::Uploading {
            self.progress = self.progress.max(percent.min(100));
        }
    }

    pub fn complete(&mut self, response: Option<&UploadResponse>) -> bool {
        if self.state != UploadState::Uploading {
            return false;
        }
        self.state = UploadState::Completed;
        if let Some(response) = response {
            self.file_url = Some(response.file_url.clone());
            self.shareable_url = Some(response.shareable_url.clone());
        }
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if !matches!(self.state, UploadState::Pending | UploadState::Uploading) {
            return false;
        }
        self.state = UploadState::Failed;
        self.error = Some(reason.into());
        true
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.state, UploadState::Completed | UploadState::Failed)
    }
}

/// Live view of the tasks of the current upload run, in batch order.
#[derive(Debug, Default)]
pub struct UploadTracker {
    tasks: Mutex<Vec<UploadTask>>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the previous run and start fresh tasks for `files`.
    pub fn reset<'a>(&self, files: impl IntoIterator<Item = (FileId, &'a str)>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            *tasks = files
                .into_iter()
                .map(|(id, name)| UploadTask::new(id, name))
                .collect();
        }
    }

    pub fn snapshot(&self) -> Vec<UploadTask> {
        self.tasks.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn get(&self, id: FileId) -> Option<UploadTask> {
        self.tasks.lock().ok()?.iter().find(|t| t.id == id).cloned()
    }

    /// Shareable links of every completed task, keyed by file.
    pub fn shareable_urls(&self) -> HashMap<FileId, String> {
        self.snapshot()
            .into_iter()
            .filter_map(|t| t.shareable_url.map(|url| (t.id, url)))
            .collect()
    }

    fn update<R>(&self, id: FileId, f: impl FnOnce(&mut UploadTask) -> R) -> Option<R> {
        let mut tasks = self.tasks.lock().ok()?;
        tasks.iter_mut().find(|t| t.id == id).map(f)
    }
}

/// Outcome of one upload run once every task has settled.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub tasks: Vec<UploadTask>,
}

impl UploadReport {
    pub fn all_succeeded(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.state == UploadState::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &UploadTask> {
        self.tasks.iter().filter(|t| t.state == UploadState::Failed)
    }
}

// ============================================================================
// Progress-observing body
// ============================================================================

pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Reports cumulative progress as the HTTP client pulls bytes from it.
struct ProgressReader<R, F> {
    inner: R,
    sent: u64,
    total: u64,
    on_progress: F,
}

impl<R, F> AsyncRead for ProgressReader<R, F>
where
    R: AsyncRead + Unpin,
    F: Fn(u8) + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            let read = (buf.filled().len() - before) as u64;
            if read > 0 {
                this.sent += read;
                (this.on_progress)(percent(this.sent, this.total));
            }
        }
        poll
    }
}

// ============================================================================
// Uploader
// ============================================================================

pub struct Uploader {
    client: reqwest::Client,
    base_url: String,
    token: CsrfToken,
    notifier: Arc<dyn Notifier>,
    tracker: Arc<UploadTracker>,
}

impl Uploader {
    pub fn new(
        base_url: impl Into<String>,
        token: CsrfToken,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            notifier,
            tracker: Arc::new(UploadTracker::new()),
        })
    }

    /// Load the uploader page and pick up the token it was rendered with.
    pub async fn connect(
        base_url: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let base_url: String = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        let html = reqwest::get(format!("{base_url}/"))
            .await?
            .error_for_status()?
            .text()
            .await?;
        let token =
            CsrfToken::from_page(&html).ok_or_else(|| ClientError::MissingToken(base_url.clone()))?;
        Self::new(base_url, token, notifier)
    }

    pub fn token(&self) -> &CsrfToken {
        &self.token
    }

    pub fn tracker(&self) -> Arc<UploadTracker> {
        Arc::clone(&self.tracker)
    }

    /// Upload every pending file at once and wait for all of them to settle.
    /// One file failing never cancels the others, and nothing is retried.
    pub async fn upload_all(&self, batch: &UploadBatch) -> UploadReport {
        if batch.is_empty() {
            self.notifier.notify(Notification::EmptyBatch);
            return UploadReport { tasks: Vec::new() };
        }

        self.tracker
            .reset(batch.files().iter().map(|f| (f.id, f.name.as_str())));

        let url = format!("{}/api/upload", self.base_url);
        let mut set = JoinSet::new();
        for file in batch.files() {
            let job = UploadJob {
                client: self.client.clone(),
                url: url.clone(),
                token: self.token.clone(),
                id: file.id,
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                data: file.data.clone(),
                tracker: Arc::clone(&self.tracker),
                notifier: Arc::clone(&self.notifier),
            };
            set.spawn(job.run());
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Upload task panicked");
            }
        }
        // A task that died mid-flight must not be reported as still uploading.
        for task in self.tracker.snapshot() {
            if !task.is_settled() {
                self.tracker
                    .update(task.id, |t| t.fail("Upload interrupted"));
            }
        }

        let report = UploadReport {
            tasks: self.tracker.snapshot(),
        };
        if report.all_succeeded() {
            self.notifier.notify(Notification::AllUploaded {
                count: report.tasks.len(),
            });
        }
        report
    }
}

struct UploadJob {
    client: reqwest::Client,
    url: String,
    token: CsrfToken,
    id: FileId,
    name: String,
    mime_type: String,
    data: Bytes,
    tracker: Arc<UploadTracker>,
    notifier: Arc<dyn Notifier>,
}

impl UploadJob {
    async fn run(self) {
        self.tracker.update(self.id, UploadTask::start);

        match self.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    let body = response.json::<UploadResponse>().await;
                    if let Err(e) = &body {
                        tracing::warn!(file_name = %self.name, error = %e, "No file URL in upload response");
                    }
                    let body = body.ok();
                    self.tracker
                        .update(self.id, |task| task.complete(body.as_ref()));
                    if let Some(body) = body {
                        self.notifier.notify(Notification::Uploaded {
                            file_name: self.name.clone(),
                            file_url: body.file_url,
                            shareable_url: body.shareable_url,
                        });
                    }
                } else {
                    let status = response.status().as_u16();
                    tracing::warn!(file_name = %self.name, status, "Upload rejected");
                    self.tracker.update(self.id, |task| {
                        task.fail(format!("Upload failed ({status})"))
                    });
                }
            }
            Err(e) => {
                tracing::warn!(file_name = %self.name, error = %e, "Upload transport error");
                self.tracker
                    .update(self.id, |task| task.fail("Network error"));
            }
        }
    }

    async fn send(&self) -> Result<reqwest::Response, reqwest::Error> {
        let total = self.data.len() as u64;
        let tracker = Arc::clone(&self.tracker);
        let id = self.id;
        let reader = ProgressReader {
            inner: Cursor::new(self.data.clone()),
            sent: 0,
            total,
            on_progress: move |pct| {
                tracker.update(id, |task| task.set_progress(pct));
            },
        };
        let body = reqwest::Body::wrap_stream(ReaderStream::with_capacity(reader, CHUNK_SIZE));

        let part = reqwest::multipart::Part::stream_with_length(body, total)
            .file_name(self.name.clone())
            .mime_str(&self.mime_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text(CSRF_FORM_FIELD, self.token.to_string());

        self.client
            .post(&self.url)
            .header(CSRF_HEADER, self.token.as_str())
            .multipart(form)
            .send()
            .await
    }
}
