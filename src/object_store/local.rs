use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{is_valid_key, ObjectStore, ObjectStoreError};

/// Flat directory of stored files.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// The directory is not touched here; it is created on first write.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if !is_valid_key(key) {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        // Idempotent; concurrent writers may race here harmlessly.
        tokio::fs::create_dir_all(&self.base_path).await?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
