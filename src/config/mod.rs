//! Engine configuration.
//!
//! `MigratorConfig` is the explicit configuration handed to a `Migrator`.
//! `ConfigFile` is its on-disk JSON form, used by the status binary and by
//! callers that keep settings next to their migrations.

use crate::adapter::Params;
use crate::storage::{JsonStore, MemoryStore, NoneStore, StateStore, DEFAULT_STORAGE_FILE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid migrations pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Source names accepted when no pattern is configured: a numeric prefix,
/// a descriptive suffix and at most one extension. Backup names such as
/// `1-a.js~` or `1-a.sql.orig` do not match.
pub const DEFAULT_MIGRATIONS_PATTERN: &str = r"^\d+[\w-]+(\.\w+)?$";

/// Default config file name
pub const CONFIG_FILE: &str = "waymark.config.json";

static DEFAULT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_MIGRATIONS_PATTERN).expect("DEFAULT_MIGRATIONS_PATTERN should be a valid regex")
});

/// Receives every progress message the engine logs.
pub type LogHook = Arc<dyn Fn(&str) + Send + Sync>;

type ParamsFn = dyn Fn() -> Params + Send + Sync;

/// Arguments handed to every migration operation of one run.
#[derive(Clone)]
pub enum MigrationParams {
    /// The same list for every run.
    List(Params),
    /// Called once per run; its result goes to every unit of that run.
    Generator(Arc<ParamsFn>),
}

impl MigrationParams {
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn() -> Params + Send + Sync + 'static,
    {
        Self::Generator(Arc::new(f))
    }

    /// Produce the list for one run.
    pub fn resolve(&self) -> Params {
        match self {
            Self::List(params) => params.clone(),
            Self::Generator(f) => f(),
        }
    }
}

impl Default for MigrationParams {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<Params> for MigrationParams {
    fn from(params: Params) -> Self {
        Self::List(params)
    }
}

impl fmt::Debug for MigrationParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(params) => f.debug_tuple("List").field(params).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Configuration for one engine instance.
#[derive(Clone)]
pub struct MigratorConfig {
    /// Source names a migration must match to be considered.
    pub migrations_pattern: Regex,
    /// Arguments for every operation, or a generator producing them.
    pub migrations_params: MigrationParams,
    /// Await the trailing completion callback of callback-style operations.
    pub promisify_migrations: bool,
    /// Applied-state backend.
    pub storage: Arc<dyn StateStore>,
    /// Optional sink for progress messages, in addition to tracing.
    pub logging: Option<LogHook>,
}

impl MigratorConfig {
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.migrations_pattern = pattern;
        self
    }

    pub fn with_params(mut self, params: impl Into<MigrationParams>) -> Self {
        self.migrations_params = params.into();
        self
    }

    pub fn with_promisify(mut self, promisify: bool) -> Self {
        self.promisify_migrations = promisify;
        self
    }

    pub fn with_storage(mut self, storage: impl StateStore + 'static) -> Self {
        self.storage = Arc::new(storage);
        self
    }

    /// Share one store between several configurations.
    pub fn with_shared_storage(mut self, storage: Arc<dyn StateStore>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_logging<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logging = Some(Arc::new(hook));
        self
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_pattern: DEFAULT_PATTERN.clone(),
            migrations_params: MigrationParams::default(),
            promisify_migrations: false,
            storage: Arc::new(JsonStore::default()),
            logging: None,
        }
    }
}

impl fmt::Debug for MigratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigratorConfig")
            .field("migrations_pattern", &self.migrations_pattern.as_str())
            .field("migrations_params", &self.migrations_params)
            .field("promisify_migrations", &self.promisify_migrations)
            .field("logging", &self.logging.is_some())
            .finish_non_exhaustive()
    }
}

/// Built-in storage backends selectable from a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Json,
    Memory,
    None,
}

fn default_migrations_path() -> PathBuf {
    PathBuf::from("migrations")
}

/// On-disk configuration (`waymark.config.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Directory holding the migration files.
    #[serde(default = "default_migrations_path")]
    pub migrations_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrations_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub migrations_params: Vec<Value>,
    #[serde(default)]
    pub promisify_migrations: bool,
    #[serde(default)]
    pub storage: StorageKind,
    /// Ledger location for the json backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            migrations_path: default_migrations_path(),
            migrations_pattern: None,
            migrations_params: Vec::new(),
            promisify_migrations: false,
            storage: StorageKind::default(),
            storage_path: None,
        }
    }
}

impl ConfigFile {
    /// Ledger path for the json backend.
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_FILE))
    }

    pub fn pattern(&self) -> Result<Regex, ConfigError> {
        match &self.migrations_pattern {
            Some(pattern) => Ok(Regex::new(pattern)?),
            None => Ok(DEFAULT_PATTERN.clone()),
        }
    }

    /// Build the engine configuration this file describes.
    pub fn to_config(&self) -> Result<MigratorConfig, ConfigError> {
        let storage: Arc<dyn StateStore> = match self.storage {
            StorageKind::Json => Arc::new(JsonStore::new(self.storage_path())),
            StorageKind::Memory => Arc::new(MemoryStore::new()),
            StorageKind::None => Arc::new(NoneStore),
        };

        Ok(MigratorConfig {
            migrations_pattern: self.pattern()?,
            migrations_params: MigrationParams::List(self.migrations_params.clone()),
            promisify_migrations: self.promisify_migrations,
            storage,
            logging: None,
        })
    }
}

/// Read a configuration file. Returns `None` if it does not exist.
pub async fn read_config(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
    if !fs::try_exists(path).await? {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let config: ConfigFile = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write a configuration file
pub async fn write_config(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_pattern() {
        let config = MigratorConfig::default();
        assert!(config.migrations_pattern.is_match("123-migration"));
        assert!(config.migrations_pattern.is_match("20240101_add_users.sql"));
        assert!(!config.migrations_pattern.is_match("README.md"));
        assert!(!config.migrations_pattern.is_match("1-a.js~"));
        assert!(!config.migrations_pattern.is_match("1-a.sql.orig"));
        assert!(!config.migrations_pattern.is_match("1-a.sql.swp"));
        assert!(!config.promisify_migrations);
    }

    #[test]
    fn test_params_list_resolve() {
        let params = MigrationParams::from(vec![json!(1), json!(2), json!(3)]);
        assert_eq!(params.resolve(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_params_generator_called_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let params = MigrationParams::generator(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![json!("db")]
        });

        assert_eq!(params.resolve(), vec![json!("db")]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_file_defaults() {
        let config: ConfigFile = serde_json::from_str("{}").unwrap();
        assert_eq!(config.migrations_path, PathBuf::from("migrations"));
        assert_eq!(config.storage, StorageKind::Json);
        assert_eq!(config.storage_path(), PathBuf::from(DEFAULT_STORAGE_FILE));
        assert!(config.migrations_params.is_empty());
    }

    #[test]
    fn test_config_file_camel_case() {
        let config: ConfigFile = serde_json::from_str(
            r#"{
                "migrationsPath": "db/migrations",
                "migrationsPattern": "\\.coffee$",
                "migrationsParams": [1, "two"],
                "promisifyMigrations": true,
                "storage": "none"
            }"#,
        )
        .unwrap();

        assert_eq!(config.migrations_path, PathBuf::from("db/migrations"));
        assert_eq!(config.storage, StorageKind::None);

        let engine_config = config.to_config().unwrap();
        assert!(engine_config.promisify_migrations);
        assert!(engine_config.migrations_pattern.is_match("1-x.coffee"));
        assert_eq!(
            engine_config.migrations_params.resolve(),
            vec![json!(1), json!("two")]
        );
    }

    #[test]
    fn test_config_file_invalid_pattern() {
        let config = ConfigFile {
            migrations_pattern: Some("(".to_string()),
            ..ConfigFile::default()
        };
        assert!(matches!(config.pattern(), Err(ConfigError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_read_config_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_config(&temp_dir.path().join(CONFIG_FILE)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        let config = ConfigFile {
            storage_path: Some(PathBuf::from("state/ledger.json")),
            ..ConfigFile::default()
        };

        write_config(&path, &config).await.unwrap();
        let read = read_config(&path).await.unwrap().unwrap();
        assert_eq!(read.storage_path(), PathBuf::from("state/ledger.json"));
    }
}
