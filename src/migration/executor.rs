//! Migration executor for running migrations.

use super::registry::is_applied;
use super::types::{ExecutionError, MigrationDirection, MigrationError};
use crate::adapter::{invoke, Params};
use crate::config::LogHook;
use crate::source::MigrationUnit;
use crate::storage::{StateStore, StorageOperation};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Executor for running migrations.
///
/// Units run strictly one after another. Each success is committed to the
/// store before the next unit's eligibility is checked, and the first
/// failure stops the run. Nothing is rolled back: units committed before the
/// failure stay committed.
pub struct MigrationExecutor {
    store: Arc<dyn StateStore>,
    promisify: bool,
    logging: Option<LogHook>,
}

impl MigrationExecutor {
    pub fn new(store: Arc<dyn StateStore>, promisify: bool, logging: Option<LogHook>) -> Self {
        Self {
            store,
            promisify,
            logging,
        }
    }

    /// Emit a progress message through tracing and the configured hook.
    pub fn log(&self, message: &str) {
        info!(target: "waymark", "{}", message);
        if let Some(hook) = &self.logging {
            hook(message);
        }
    }

    /// Run `units` in the given order.
    ///
    /// Each unit is re-checked against the store right before it runs, so a
    /// unit that became ineligible since resolution is skipped. Returns the
    /// ids that were processed.
    pub async fn run(
        &self,
        direction: MigrationDirection,
        units: &[Arc<MigrationUnit>],
        params: &Params,
    ) -> Result<Vec<String>, ExecutionError> {
        let mut completed: Vec<String> = Vec::new();

        for (index, unit) in units.iter().enumerate() {
            let id = unit.id();

            let applied = match self.store.executed().await {
                Ok(applied) => applied,
                Err(e) => {
                    error!(migration = %id, error = %e, "Failed to read migration state");
                    return Err(ExecutionError {
                        completed,
                        failed: None,
                        not_attempted: ids_from(&units[index..]),
                        error: MigrationError::storage(StorageOperation::Read, e),
                    });
                }
            };

            let eligible = match direction {
                MigrationDirection::Up => !is_applied(&applied, unit),
                MigrationDirection::Down => is_applied(&applied, unit),
            };
            if !eligible {
                debug!(migration = %id, %direction, "Skipping ineligible migration");
                continue;
            }

            let operation = unit.operation(direction);
            self.log(&format!("== {}: {} =======", id, direction.progressive()));
            debug!(migration = %id, style = operation.style(), "Invoking migration");

            let started = Instant::now();
            if let Err(cause) = invoke(operation, params.clone(), self.promisify).await {
                error!(migration = %id, %direction, error = %cause, "Migration failed");
                return Err(ExecutionError {
                    completed,
                    failed: Some(id.to_string()),
                    not_attempted: ids_from(&units[index + 1..]),
                    error: MigrationError::OperationFailed {
                        id: id.to_string(),
                        direction,
                        cause,
                    },
                });
            }

            // Up records the source name. Down removes whichever entry named the unit.
            let (operation_kind, commit) = match direction {
                MigrationDirection::Up => (
                    StorageOperation::Log,
                    self.store.log_migration(unit.source_name()).await,
                ),
                MigrationDirection::Down => {
                    let entry = applied
                        .iter()
                        .find(|name| unit.matches(name))
                        .map_or(unit.source_name(), String::as_str);
                    (StorageOperation::Unlog, self.store.unlog_migration(entry).await)
                }
            };
            if let Err(e) = commit {
                error!(migration = %id, error = %e, "Failed to record migration state");
                return Err(ExecutionError {
                    completed,
                    failed: Some(id.to_string()),
                    not_attempted: ids_from(&units[index + 1..]),
                    error: MigrationError::storage(operation_kind, e),
                });
            }

            self.log(&format!(
                "== {}: {} ({:.3}s)",
                id,
                direction.past(),
                started.elapsed().as_secs_f64()
            ));
            completed.push(id.to_string());
        }

        info!(%direction, count = completed.len(), "Migration run completed");
        Ok(completed)
    }
}

fn ids_from(units: &[Arc<MigrationUnit>]) -> Vec<String> {
    units.iter().map(|u| u.id().to_string()).collect()
}
