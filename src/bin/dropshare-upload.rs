//! dropshare-upload — upload files to a running dropshare server and print
//! their shareable links, or check a shared link.
//!
//! Server URL comes from `--server` or DROPSHARE_URL.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dropshare::client::{
    format_size, viewer::filename_from_share_url, LogNotifier, SelectedFile, ShareView,
    ShareViewer, UploadBatch, UploadState, Uploader,
};
use dropshare::upload::MAX_FILE_SIZE;

#[derive(Parser)]
#[command(name = "dropshare-upload", about = "dropshare command-line client")]
struct Cli {
    /// Base URL of the dropshare server
    #[arg(long, env = "DROPSHARE_URL", default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files (JPG, PNG, PDF; 10MB max each)
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Maximum number of files per batch
        #[arg(long, default_value = "5")]
        max_files: usize,
        /// Per-file size limit checked before uploading, in bytes
        #[arg(long, default_value_t = MAX_FILE_SIZE)]
        max_size: u64,
    },
    /// Check a shared link (or stored filename) and describe the file
    Open {
        /// Shareable URL or stored filename
        link: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let notifier = Arc::new(LogNotifier);

    match cli.command {
        Commands::Upload {
            files,
            max_files,
            max_size,
        } => {
            let mut selected = Vec::with_capacity(files.len());
            for path in &files {
                let file = SelectedFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                selected.push(file);
            }

            let mut batch = UploadBatch::new(max_files, notifier.clone()).with_max_size(max_size);
            batch
                .drop_files(selected)
                .context("Files rejected before upload")?;

            for file in batch.files() {
                println!(
                    "{:<6} {}  {}  {}",
                    format!("{:?}", file.kind()),
                    file.name,
                    file.mime_type,
                    format_size(file.size())
                );
            }

            let uploader = Uploader::connect(&cli.server, notifier)
                .await
                .context("Failed to load uploader page")?;
            let report = uploader.upload_all(&batch).await;

            for task in &report.tasks {
                match task.state {
                    UploadState::Completed => println!(
                        "{}: {}",
                        task.file_name,
                        task.shareable_url.as_deref().unwrap_or("(no link returned)")
                    ),
                    _ => println!(
                        "{}: {}",
                        task.file_name,
                        task.error.as_deref().unwrap_or("Failed")
                    ),
                }
            }

            if !report.all_succeeded() {
                anyhow::bail!("{} upload(s) failed", report.failed().count());
            }
        }
        Commands::Open { link } => {
            let filename = filename_from_share_url(&link)
                .with_context(|| format!("Not a shared link: {link}"))?;
            let viewer = ShareViewer::new(&cli.server)?;
            match viewer.open(filename).await {
                ShareView::Found {
                    kind,
                    file_url,
                    share_url,
                    ..
                } => {
                    println!("kind:     {kind:?}");
                    println!("download: {file_url}");
                    println!("share:    {share_url}");
                }
                ShareView::NotFound { message, home_url } => {
                    anyhow::bail!("{message} (upload again at {home_url})");
                }
            }
        }
    }

    Ok(())
}
