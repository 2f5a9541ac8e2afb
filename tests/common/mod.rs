//! Helpers shared by the HTTP integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use dropshare::config::{Config, Environment, NodeConfig, StorageConfig};
use dropshare::object_store::LocalStore;
use dropshare::upload::MAX_FILE_SIZE;
use dropshare::AppState;

pub const TOKEN: &str = "3f2b8c1e-6d4a-4e9b-8f0c-2a7d5e1b9c4f";

pub struct TestServer {
    pub base_url: String,
    pub upload_dir: PathBuf,
    _dir: tempfile::TempDir,
}

pub async fn spawn(environment: Environment) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let upload_dir = dir.path().join("public").join("uploads");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            default_host: "localhost:3000".to_string(),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_string_lossy().to_string(),
        },
        environment,
        max_upload_size: MAX_FILE_SIZE,
        max_files: 5,
    };
    let state = Arc::new(AppState {
        config,
        object_store: Arc::new(LocalStore::new(&upload_dir)),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = dropshare::api::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        upload_dir,
        _dir: dir,
    }
}

pub fn file_part(name: &str, mime: &str, data: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(data)
        .file_name(name.to_string())
        .mime_str(mime)
        .unwrap()
}

/// POST a single-file form with the given header and form tokens.
pub async fn post_upload(
    server: &TestServer,
    header_token: Option<&str>,
    form_token: Option<&str>,
    file: Option<reqwest::multipart::Part>,
) -> reqwest::Response {
    let mut form = reqwest::multipart::Form::new();
    if let Some(part) = file {
        form = form.part("file", part);
    }
    if let Some(token) = form_token {
        form = form.text("csrfToken", token.to_string());
    }

    let mut request = reqwest::Client::new()
        .post(format!("{}/api/upload", server.base_url))
        .multipart(form);
    if let Some(token) = header_token {
        request = request.header("X-CSRF-Token", token);
    }
    request.send().await.unwrap()
}
