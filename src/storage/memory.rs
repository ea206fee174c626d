use super::{StateStore, StorageError};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process store. State is lost when the value is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ids: RwLock<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already-applied list, e.g. a ledger imported from elsewhere.
    pub fn with_executed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seeded: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !seeded.contains(&id) {
                seeded.push(id);
            }
        }
        Self {
            ids: RwLock::new(seeded),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn log_migration(&self, id: &str) -> Result<(), StorageError> {
        let mut ids = self.ids.write().await;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        Ok(())
    }

    async fn unlog_migration(&self, id: &str) -> Result<(), StorageError> {
        self.ids.write().await.retain(|existing| existing != id);
        Ok(())
    }

    async fn executed(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.ids.read().await.clone())
    }
}

/// Store that records nothing. Every run sees an empty applied set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoneStore;

#[async_trait]
impl StateStore for NoneStore {
    async fn log_migration(&self, _id: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn unlog_migration(&self, _id: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn executed(&self) -> Result<Vec<String>, StorageError> {
        Ok(Vec::new())
    }
}
