//! Types shared by migration sources.

use crate::adapter::Operation;
use crate::migration::MigrationDirection;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Migrations directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read migrations directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Migration file name is not valid UTF-8: {0}")]
    InvalidFileName(PathBuf),

    #[error("Failed to load migration {file}: {cause}")]
    LoadFailed { file: String, cause: anyhow::Error },
}

/// One reversible migration: an id plus its up and down operations.
///
/// `source_name` is what the ledger records. For units read from disk it is
/// the file name, for units built in code it defaults to the id.
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    id: String,
    source_name: String,
    up: Operation,
    down: Operation,
}

impl MigrationUnit {
    /// Create a unit whose operations are both no-ops.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            source_name: id.clone(),
            id,
            up: Operation::Noop,
            down: Operation::Noop,
        }
    }

    pub fn with_up(mut self, up: Operation) -> Self {
        self.up = up;
        self
    }

    pub fn with_down(mut self, down: Operation) -> Self {
        self.down = down;
        self
    }

    /// Name the pattern is matched against and the ledger records.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = source_name.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Whether `name` refers to this unit, by id or by source name.
    pub fn matches(&self, name: &str) -> bool {
        self.id == name || self.source_name == name
    }

    pub fn operation(&self, direction: MigrationDirection) -> &Operation {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }
}

/// Operations produced by a loader for one migration file.
#[derive(Debug, Clone, Default)]
pub struct LoadedMigration {
    pub up: Operation,
    pub down: Operation,
}
