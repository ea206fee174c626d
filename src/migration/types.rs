//! Types for the migration system.

use crate::source::SourceError;
use crate::storage::{StorageError, StorageOperation};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error types for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Unknown migration: {0}")]
    UnknownMigration(String),

    #[error("Invalid method {0:?}, expected \"up\" or \"down\"")]
    InvalidMethod(String),

    #[error("Migration {id} failed while running {direction}: {cause}")]
    OperationFailed {
        id: String,
        direction: MigrationDirection,
        cause: anyhow::Error,
    },

    #[error("Storage operation {operation} failed: {source}")]
    StorageFailure {
        operation: StorageOperation,
        #[source]
        source: StorageError,
    },

    #[error("Duplicate migration id: {0}")]
    DuplicateMigration(String),

    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),
}

impl MigrationError {
    pub(crate) fn storage(operation: StorageOperation, source: StorageError) -> Self {
        Self::StorageFailure { operation, source }
    }
}

/// A failed `execute` call.
///
/// Separates the units that were applied (or reverted) and durably recorded,
/// the unit that failed, and the units that were never attempted. Errors
/// raised before any unit ran have all three empty.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ExecutionError {
    /// Units processed and committed before the failure, in run order.
    pub completed: Vec<String>,
    /// The unit whose operation or commit failed.
    pub failed: Option<String>,
    /// Units after the failure point that were not touched.
    pub not_attempted: Vec<String>,
    #[source]
    pub error: MigrationError,
}

impl From<MigrationError> for ExecutionError {
    fn from(error: MigrationError) -> Self {
        Self {
            completed: Vec::new(),
            failed: None,
            not_attempted: Vec::new(),
            error,
        }
    }
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationDirection {
    /// Apply pending migrations.
    Up,
    /// Revert applied migrations.
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub(crate) fn progressive(&self) -> &'static str {
        match self {
            Self::Up => "migrating",
            Self::Down => "reverting",
        }
    }

    pub(crate) fn past(&self) -> &'static str {
        match self {
            Self::Up => "migrated",
            Self::Down => "reverted",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationDirection {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(MigrationError::InvalidMethod(other.to_string())),
        }
    }
}

/// Which migrations one call targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Up: every pending migration. Down: only the most recently applied one.
    #[default]
    Default,
    /// Up: every pending migration. Down: every applied one, newest first.
    All,
    /// Exactly these ids. Ineligible ones are skipped.
    Only(Vec<String>),
    /// Up: pending migrations up to and including this id.
    /// Down: applied migrations from the newest back to and including this id.
    To(String),
}

impl Selection {
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(ids.into_iter().map(Into::into).collect())
    }

    pub fn to(id: impl Into<String>) -> Self {
        Self::To(id.into())
    }
}

impl From<&str> for Selection {
    fn from(id: &str) -> Self {
        Self::Only(vec![id.to_string()])
    }
}

impl From<String> for Selection {
    fn from(id: String) -> Self {
        Self::Only(vec![id])
    }
}

impl From<Vec<String>> for Selection {
    fn from(ids: Vec<String>) -> Self {
        Self::Only(ids)
    }
}

impl From<Option<Vec<String>>> for Selection {
    fn from(ids: Option<Vec<String>>) -> Self {
        ids.map(Self::Only).unwrap_or_default()
    }
}
