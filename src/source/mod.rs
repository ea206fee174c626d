//! Migration sources.
//!
//! A source hands the engine `{id, up, down}` records. It owns enumeration
//! and loading; the resolver and executor never touch the file system.

mod directory;
mod types;

pub use directory::{migration_id, DirectorySource};
pub use types::{LoadedMigration, MigrationUnit, SourceError};

use async_trait::async_trait;
use regex::Regex;

/// Provider of migration units.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// Units whose source name matches `pattern`. Order does not matter;
    /// the registry sorts them.
    async fn migrations(&self, pattern: &Regex) -> Result<Vec<MigrationUnit>, SourceError>;
}

/// Units built in code.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    units: Vec<MigrationUnit>,
}

impl StaticSource {
    pub fn new(units: Vec<MigrationUnit>) -> Self {
        Self { units }
    }

    pub fn push(&mut self, unit: MigrationUnit) {
        self.units.push(unit);
    }
}

#[async_trait]
impl MigrationSource for StaticSource {
    async fn migrations(&self, pattern: &Regex) -> Result<Vec<MigrationUnit>, SourceError> {
        Ok(self
            .units
            .iter()
            .filter(|unit| pattern.is_match(unit.source_name()))
            .cloned()
            .collect())
    }
}
