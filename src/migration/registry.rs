//! Migration registry: ordering and selection of known migrations.

use super::types::{MigrationDirection, MigrationError, Selection};
use crate::source::MigrationUnit;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Registry of all known migrations.
///
/// Migrations are kept sorted by id, which is the run order. The registry
/// turns a direction and a [`Selection`] into the ordered list of units a
/// run should process.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: Vec<Arc<MigrationUnit>>,
}

impl MigrationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// Build a registry from the units a source returned. Sources apply the
    /// migrations pattern, so every unit is registered.
    pub fn from_units(units: Vec<MigrationUnit>) -> Result<Self, MigrationError> {
        let mut registry = Self::new();
        for unit in units {
            registry.register(unit)?;
        }
        Ok(registry)
    }

    /// Register a migration, keeping the registry sorted by id.
    pub fn register(&mut self, unit: MigrationUnit) -> Result<(), MigrationError> {
        match self
            .migrations
            .binary_search_by(|m| m.id().cmp(unit.id()))
        {
            Ok(_) => Err(MigrationError::DuplicateMigration(unit.id().to_string())),
            Err(position) => {
                self.migrations.insert(position, Arc::new(unit));
                Ok(())
            }
        }
    }

    /// All known ids in run order.
    pub fn ids(&self) -> Vec<String> {
        self.migrations.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Position of the unit named by `name`, either its id or its source name.
    fn position(&self, name: &str) -> Result<usize, MigrationError> {
        self.migrations
            .binary_search_by(|m| m.id().cmp(name))
            .or_else(|_| {
                self.migrations
                    .iter()
                    .position(|m| m.source_name() == name)
                    .ok_or(())
            })
            .map_err(|_| MigrationError::UnknownMigration(name.to_string()))
    }

    /// Look up a migration by id or source name.
    pub fn find(&self, id: &str) -> Result<&Arc<MigrationUnit>, MigrationError> {
        let position = self.position(id)?;
        Ok(&self.migrations[position])
    }

    /// Check that every id named by `selection` is known.
    pub fn validate(&self, selection: &Selection) -> Result<(), MigrationError> {
        match selection {
            Selection::Default | Selection::All => Ok(()),
            Selection::To(target) => self.position(target).map(|_| ()),
            Selection::Only(ids) => ids.iter().try_for_each(|id| self.position(id).map(|_| ())),
        }
    }

    /// Known migrations that are not in `applied`, in run order.
    pub fn pending(&self, applied: &[String]) -> Vec<Arc<MigrationUnit>> {
        self.migrations
            .iter()
            .filter(|m| !is_applied(applied, m))
            .cloned()
            .collect()
    }

    /// Resolve the units one run should process.
    ///
    /// Every id named by the selection is checked before anything else, so an
    /// unknown id fails the call with nothing executed. Units that are not
    /// eligible for `direction` are dropped.
    pub fn resolve(
        &self,
        direction: MigrationDirection,
        selection: &Selection,
        applied: &[String],
    ) -> Result<Vec<Arc<MigrationUnit>>, MigrationError> {
        let resolved = match (direction, selection) {
            (MigrationDirection::Up, Selection::Default | Selection::All) => self.pending(applied),
            (MigrationDirection::Up, Selection::To(target)) => {
                let end = self.position(target)?;
                self.migrations[..=end]
                    .iter()
                    .filter(|m| !is_applied(applied, m))
                    .cloned()
                    .collect()
            }
            (MigrationDirection::Down, Selection::Default) => self.applied_newest_first(applied, Some(1))?,
            (MigrationDirection::Down, Selection::All) => self.applied_newest_first(applied, None)?,
            (MigrationDirection::Down, Selection::To(target)) => {
                let target = Arc::clone(self.find(target)?);
                if !is_applied(applied, &target) {
                    debug!(migration = %target.id(), "Target migration is not applied, nothing to revert");
                    return Ok(Vec::new());
                }

                let mut units = Vec::new();
                for name in applied.iter().rev() {
                    let unit = self.find(name)?;
                    units.push(Arc::clone(unit));
                    if unit.id() == target.id() {
                        break;
                    }
                }
                units
            }
            (direction, Selection::Only(ids)) => {
                let positions = ids
                    .iter()
                    .map(|id| self.position(id))
                    .collect::<Result<BTreeSet<_>, _>>()?;

                let ordered: Vec<usize> = match direction {
                    MigrationDirection::Up => positions.into_iter().collect(),
                    MigrationDirection::Down => positions.into_iter().rev().collect(),
                };

                ordered
                    .into_iter()
                    .map(|i| &self.migrations[i])
                    .filter(|m| match direction {
                        MigrationDirection::Up => !is_applied(applied, m),
                        MigrationDirection::Down => is_applied(applied, m),
                    })
                    .cloned()
                    .collect()
            }
        };

        Ok(resolved)
    }

    /// Applied units, most recently applied first.
    fn applied_newest_first(
        &self,
        applied: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<Arc<MigrationUnit>>, MigrationError> {
        applied
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .map(|id| self.find(id).map(Arc::clone))
            .collect()
    }
}

/// Whether any ledger entry names `unit`.
pub(crate) fn is_applied(applied: &[String], unit: &MigrationUnit) -> bool {
    applied.iter().any(|name| unit.matches(name))
}
