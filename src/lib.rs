pub mod adapter;
pub mod config;
pub mod engine;
pub mod migration;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use adapter::{invoke, AdapterError, Completion, Operation, Params};
pub use config::{
    read_config, write_config, ConfigError, ConfigFile, LogHook, MigrationParams, MigratorConfig,
    StorageKind,
};
pub use engine::{ExecuteOptions, Migrator};
pub use migration::{
    ExecutionError, MigrationDirection, MigrationError, MigrationExecutor, MigrationRegistry,
    Selection,
};
pub use source::{
    DirectorySource, LoadedMigration, MigrationSource, MigrationUnit, SourceError, StaticSource,
};
pub use storage::{
    JsonStore, MemoryStore, NoneStore, StateStore, StorageError, StorageOperation,
};
