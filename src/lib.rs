//! dropshare - browser file uploads with shareable links
//!
//! This crate provides:
//! - An axum server that accepts single-file uploads guarded by a
//!   double-submit CSRF token, stores them under random names and issues
//!   direct and shareable URLs
//! - A flat local-directory object store
//! - A client layer (batching, concurrent uploads with progress, share
//!   probing) that drives the server the way the browser page does

pub mod api;
pub mod client;
pub mod config;
pub mod csrf;
pub mod object_store;
pub mod share;
pub mod upload;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;

/// Shared application state. Immutable after startup.
pub struct AppState {
    pub config: Config,
    pub object_store: Arc<dyn object_store::ObjectStore>,
}
