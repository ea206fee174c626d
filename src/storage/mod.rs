//! Applied-state storage.
//!
//! The engine only needs three operations from a backend: record an id,
//! forget an id, and list what is recorded in insertion order. Any backend
//! satisfying [`StateStore`] can be plugged into a `Migrator`.
//!
//! Stores promise read-after-write consistency within one process. They do
//! not coordinate between processes; a backend that needs that must bring its
//! own locking.

mod json;
mod memory;

pub use json::{JsonStore, DEFAULT_STORAGE_FILE};
pub use memory::{MemoryStore, NoneStore};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Which store operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    Log,
    Unlog,
    Read,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Log => "logMigration",
            Self::Unlog => "unlogMigration",
            Self::Read => "executed",
        };
        f.write_str(name)
    }
}

/// Persistent record of which migrations have been applied.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Record `id` as applied. Recording an id twice is a no-op.
    /// Must be durable before returning `Ok`.
    async fn log_migration(&self, id: &str) -> Result<(), StorageError>;

    /// Remove `id` from the applied set. Removing an unknown id is a no-op.
    async fn unlog_migration(&self, id: &str) -> Result<(), StorageError>;

    /// Applied ids in the order they were logged.
    async fn executed(&self) -> Result<Vec<String>, StorageError>;
}
