//! The `Migrator` facade.
//!
//! One `Migrator` owns its configuration and source. Instances share nothing
//! unless the caller hands them the same store, so several independently
//! configured engines can live in one process.
//!
//! Two runs against the same store are not coordinated. If they overlap, both
//! may see a unit as pending and apply it twice. Callers that need
//! cross-process safety must use a store that provides its own locking.

use crate::config::{MigrationParams, MigratorConfig};
use crate::migration::{
    ExecutionError, MigrationDirection, MigrationError, MigrationExecutor, MigrationRegistry,
    Selection,
};
use crate::source::MigrationSource;
use crate::storage::StorageOperation;
use std::sync::Arc;
use tracing::info;

/// Options for one [`Migrator::execute`] call.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub method: MigrationDirection,
    pub selection: Selection,
    /// Overrides the configured params for this call.
    pub params: Option<MigrationParams>,
}

impl ExecuteOptions {
    /// Options for `method` ("up" or "down") with the default selection.
    pub fn new(method: &str) -> Result<Self, MigrationError> {
        Ok(Self::for_direction(method.parse()?))
    }

    pub fn for_direction(method: MigrationDirection) -> Self {
        Self {
            method,
            selection: Selection::Default,
            params: None,
        }
    }

    pub fn with_selection(mut self, selection: impl Into<Selection>) -> Self {
        self.selection = selection.into();
        self
    }

    pub fn with_params(mut self, params: impl Into<MigrationParams>) -> Self {
        self.params = Some(params.into());
        self
    }
}

/// Entry point of the engine.
pub struct Migrator {
    config: MigratorConfig,
    source: Arc<dyn MigrationSource>,
    executor: MigrationExecutor,
}

impl Migrator {
    pub fn new(config: MigratorConfig, source: impl MigrationSource + 'static) -> Self {
        Self::with_source(config, Arc::new(source))
    }

    pub fn with_source(config: MigratorConfig, source: Arc<dyn MigrationSource>) -> Self {
        let executor = MigrationExecutor::new(
            Arc::clone(&config.storage),
            config.promisify_migrations,
            config.logging.clone(),
        );

        Self {
            config,
            source,
            executor,
        }
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Load and order the known migrations.
    async fn registry(&self) -> Result<MigrationRegistry, MigrationError> {
        let units = self
            .source
            .migrations(&self.config.migrations_pattern)
            .await?;
        MigrationRegistry::from_units(units)
    }

    /// Apply or revert the selected migrations.
    ///
    /// Unknown ids are reported before the store is read and before any unit
    /// runs. Params are resolved once, and the same list goes to every unit.
    pub async fn execute(&self, options: ExecuteOptions) -> Result<Vec<String>, ExecutionError> {
        let ExecuteOptions {
            method,
            selection,
            params,
        } = options;

        let registry = self.registry().await?;
        registry.validate(&selection)?;
        let applied = self.executed().await?;
        let units = registry.resolve(method, &selection, &applied)?;

        let params = params
            .as_ref()
            .unwrap_or(&self.config.migrations_params)
            .resolve();

        info!(
            %method,
            candidates = units.len(),
            known = registry.len(),
            "Starting migration run"
        );

        self.executor.run(method, &units, &params).await
    }

    /// Apply migrations. `Selection::Default` applies everything pending.
    pub async fn up(&self, selection: impl Into<Selection>) -> Result<Vec<String>, ExecutionError> {
        self.execute(ExecuteOptions::for_direction(MigrationDirection::Up).with_selection(selection))
            .await
    }

    /// Revert migrations. `Selection::Default` reverts the most recent one.
    pub async fn down(
        &self,
        selection: impl Into<Selection>,
    ) -> Result<Vec<String>, ExecutionError> {
        self.execute(
            ExecuteOptions::for_direction(MigrationDirection::Down).with_selection(selection),
        )
        .await
    }

    /// Every known migration id, in run order.
    pub async fn migrations(&self) -> Result<Vec<String>, MigrationError> {
        Ok(self.registry().await?.ids())
    }

    /// Known migrations not yet applied, in run order.
    pub async fn pending(&self) -> Result<Vec<String>, MigrationError> {
        let registry = self.registry().await?;
        let applied = self.executed().await?;
        Ok(registry
            .pending(&applied)
            .iter()
            .map(|m| m.id().to_string())
            .collect())
    }

    /// Applied migrations in the order they were recorded.
    pub async fn executed(&self) -> Result<Vec<String>, MigrationError> {
        self.config
            .storage
            .executed()
            .await
            .map_err(|e| MigrationError::storage(StorageOperation::Read, e))
    }

    /// Ledger entries that name no known migration, in ledger order.
    pub async fn orphaned(&self) -> Result<Vec<String>, MigrationError> {
        let registry = self.registry().await?;
        let applied = self.executed().await?;
        Ok(applied
            .into_iter()
            .filter(|name| registry.find(name).is_err())
            .collect())
    }

    /// Emit a message through the engine's logging.
    pub fn log(&self, message: &str) {
        self.executor.log(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Operation;
    use crate::source::{MigrationUnit, StaticSource};
    use crate::storage::MemoryStore;

    fn migrator(ids: &[&str]) -> Migrator {
        let units = ids.iter().map(|id| MigrationUnit::new(*id)).collect();
        Migrator::new(
            MigratorConfig::default().with_storage(MemoryStore::new()),
            StaticSource::new(units),
        )
    }

    #[test]
    fn test_execute_options_invalid_method() {
        let result = ExecuteOptions::new("sideways");
        assert!(matches!(result, Err(MigrationError::InvalidMethod(_))));
    }

    #[test]
    fn test_execute_options_builder() {
        let options = ExecuteOptions::new("down")
            .unwrap()
            .with_selection("1-a")
            .with_params(vec![serde_json::json!(1)]);
        assert_eq!(options.method, MigrationDirection::Down);
        assert_eq!(options.selection, Selection::only(["1-a"]));
        assert!(options.params.is_some());
    }

    #[tokio::test]
    async fn test_pending_and_executed() {
        let migrator = migrator(&["2-b", "1-a"]);
        assert_eq!(migrator.pending().await.unwrap(), vec!["1-a", "2-b"]);
        assert!(migrator.executed().await.unwrap().is_empty());

        migrator.up("1-a").await.unwrap();
        assert_eq!(migrator.pending().await.unwrap(), vec!["2-b"]);
        assert_eq!(migrator.executed().await.unwrap(), vec!["1-a"]);
    }

    #[tokio::test]
    async fn test_pattern_hides_units() {
        let units = vec![
            MigrationUnit::new("1-a"),
            MigrationUnit::new("helpers").with_up(Operation::sync(|_| {
                anyhow::bail!("should never run")
            })),
        ];
        let migrator = Migrator::new(
            MigratorConfig::default().with_storage(MemoryStore::new()),
            StaticSource::new(units),
        );

        assert_eq!(migrator.up(Selection::Default).await.unwrap(), vec!["1-a"]);

        let err = migrator.up("helpers").await.unwrap_err();
        assert!(matches!(err.error, MigrationError::UnknownMigration(_)));
    }

    #[tokio::test]
    async fn test_orphaned_keeps_ledger_order() {
        let units = vec![MigrationUnit::new("2-b").with_source_name("2-b.sql")];
        let migrator = Migrator::new(
            MigratorConfig::default().with_storage(MemoryStore::with_executed([
                "9-z", "2-b.sql", "0-removed", "5-gone",
            ])),
            StaticSource::new(units),
        );

        assert_eq!(
            migrator.orphaned().await.unwrap(),
            vec!["9-z", "0-removed", "5-gone"]
        );
        assert!(migrator.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_reaches_hook() {
        let lines = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let migrator = Migrator::new(
            MigratorConfig::default()
                .with_storage(MemoryStore::new())
                .with_logging(move |m| sink.lock().unwrap().push(m.to_string())),
            StaticSource::default(),
        );

        migrator.log("hello");
        assert_eq!(*lines.lock().unwrap(), vec!["hello"]);
    }
}
