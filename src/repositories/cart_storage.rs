use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::models::{StorageError, StorageResult};

/// Local key-value persistence primitive used for carts
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn load(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value stored under `key`
    async fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Drop the value stored under `key`; missing keys are not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// One JSON file per key under a data directory
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    data_dir: PathBuf,
}

impl FileCartStorage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Map a storage key onto a file name. Bytes outside `[A-Za-z0-9_-]` are
    /// percent-encoded so distinct keys never share a file.
    pub fn path_for_key(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }

        let mut file_name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                file_name.push(byte as char);
            } else {
                file_name.push_str(&format!("%{:02X}", byte));
            }
        }
        file_name.push_str(".json");

        Ok(self.data_dir.join(file_name))
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl CartStorage for FileCartStorage {
    #[instrument(skip(self))]
    async fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for_key(key)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored value");
                Ok(None)
            }
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for_key(key)?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value)
            .await
            .map_err(|e| Self::io_error(key, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        debug!("Value stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for_key(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// Process-local storage, used by tests and ephemeral deployments
#[derive(Debug, Default)]
pub struct InMemoryCartStorage {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryCartStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CartStorage for InMemoryCartStorage {
    async fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
