//! Migration resolution and execution.
//!
//! # Overview
//!
//! - Known migrations are collected into a `MigrationRegistry`, sorted by id
//! - The registry resolves a direction plus a `Selection` into an ordered list
//! - The `MigrationExecutor` runs that list one unit at a time, committing each
//!   success to the state store and stopping at the first failure
//! - Up runs go in ascending id order; down runs undo the newest first
//! - The ledger records each unit's source name; selections and ledger
//!   entries match a unit by id or by source name
//!
//! # Usage
//!
//! ```ignore
//! let registry = MigrationRegistry::from_units(source.migrations(&pattern).await?)?;
//! let applied = store.executed().await?;
//! let units = registry.resolve(MigrationDirection::Up, &Selection::Default, &applied)?;
//! let done = executor.run(MigrationDirection::Up, &units, &params).await?;
//! ```

mod executor;
mod registry;
mod types;

pub use executor::MigrationExecutor;
pub use registry::MigrationRegistry;
pub use types::{ExecutionError, MigrationDirection, MigrationError, Selection};
