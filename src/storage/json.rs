use super::{StateStore, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// File name used when no storage path is configured.
pub const DEFAULT_STORAGE_FILE: &str = "waymark.json";

/// File-backed store holding a JSON array of applied ids.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger from disk. A missing file is an empty ledger.
    async fn read(&self) -> Result<Vec<String>, StorageError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = serde_json::from_str(&content)?;
        Ok(ids)
    }

    /// Write the ledger atomically (temp file + rename). Caller must hold the lock.
    async fn write_unlocked(&self, ids: &[String]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(ids)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), count = ids.len(), "Wrote migration ledger");
        Ok(())
    }
}

impl Default for JsonStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_FILE)
    }
}

#[async_trait]
impl StateStore for JsonStore {
    async fn log_migration(&self, id: &str) -> Result<(), StorageError> {
        // Lock the entire read-modify-write cycle
        let _guard = self.lock.lock().await;

        let mut ids = self.read().await?;
        if ids.iter().any(|existing| existing == id) {
            return Ok(());
        }

        ids.push(id.to_string());
        self.write_unlocked(&ids).await
    }

    async fn unlog_migration(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;

        let mut ids = self.read().await?;
        let before = ids.len();
        ids.retain(|existing| existing != id);
        if ids.len() == before {
            return Ok(());
        }

        self.write_unlocked(&ids).await
    }

    async fn executed(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}
