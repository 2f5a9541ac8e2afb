//! Shared test helpers.

use std::sync::Arc;

use crate::config::{Config, Environment, NodeConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::upload::MAX_FILE_SIZE;
use crate::AppState;

/// Create a test AppState storing files under a temporary directory.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let upload_dir = temp_dir.path().join("uploads");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            default_host: "localhost:3000".to_string(),
        },
        storage: StorageConfig {
            upload_dir: upload_dir.to_string_lossy().to_string(),
        },
        environment: Environment::Development,
        max_upload_size: MAX_FILE_SIZE,
        max_files: 5,
    };

    Arc::new(AppState {
        config,
        object_store: Arc::new(LocalStore::new(&upload_dir)),
    })
}

/// Bind the router to an ephemeral port and return its base URL.
pub async fn spawn_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    let app = crate::api::create_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}
