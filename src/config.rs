use thiserror::Error;

use crate::upload::MAX_FILE_SIZE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub environment: Environment,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    /// Maximum number of files a client may batch in one upload
    pub max_files: usize,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Host used to build URLs when a request carries no `Host` header.
    pub default_host: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory stored files are written to (and served from)
    pub upload_dir: String,
}

/// Deployment environment. Only affects the scheme of issued URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn scheme(self) -> &'static str {
        match self {
            Environment::Production => "https",
            Environment::Development => "http",
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            default_host: "localhost:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: "public/uploads".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_host =
            std::env::var("DEFAULT_HOST").unwrap_or_else(|_| "localhost:3000".to_string());

        let upload_dir =
            std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string());

        let environment = match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_FILE_SIZE);

        let max_files = std::env::var("MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let config = Config {
            node: NodeConfig {
                bind_address,
                default_host,
            },
            storage: StorageConfig { upload_dir },
            environment,
            max_upload_size,
            max_files,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.upload_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "UPLOAD_DIR cannot be empty".to_string(),
            ));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_files == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_FILES must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_size > MAX_FILE_SIZE {
            tracing::warn!(
                max_upload_size = self.max_upload_size,
                "MAX_UPLOAD_SIZE is above the 10MB limit clients are told about"
            );
        }

        Ok(())
    }

    /// Request body limit for the upload route. Well above the file limit so
    /// that moderately oversize files are read through to the token field and
    /// rejected by the handler's own size check.
    pub fn upload_body_limit(&self) -> usize {
        (self.max_upload_size as usize)
            .saturating_mul(2)
            .saturating_add(1024 * 1024)
    }
}
