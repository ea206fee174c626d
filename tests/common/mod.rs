#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use waymark::{
    MemoryStore, MigrationDirection, MigrationUnit, Migrator, MigratorConfig, Operation, Params,
    StateStore, StaticSource,
};

/// One recorded operation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub id: String,
    pub direction: MigrationDirection,
    pub params: Params,
}

/// Shared log of every operation invoked during a test.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str, direction: MigrationDirection, params: Params) {
        self.calls.lock().unwrap().push(Call {
            id: id.to_string(),
            direction,
            params,
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Ids invoked in `direction`, in invocation order.
    pub fn ids(&self, direction: MigrationDirection) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.direction == direction)
            .map(|c| c.id)
            .collect()
    }

    pub fn count(&self, id: &str, direction: MigrationDirection) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.id == id && c.direction == direction)
            .count()
    }
}

fn recording_operation(id: &str, direction: MigrationDirection, recorder: &Recorder) -> Operation {
    let id = id.to_string();
    let recorder = recorder.clone();
    Operation::sync(move |params| {
        recorder.record(&id, direction, params);
        Ok(())
    })
}

/// Unit whose up and down both record their calls and succeed.
pub fn recorded_unit(id: &str, recorder: &Recorder) -> MigrationUnit {
    MigrationUnit::new(id)
        .with_up(recording_operation(id, MigrationDirection::Up, recorder))
        .with_down(recording_operation(id, MigrationDirection::Down, recorder))
}

/// Unit whose up records the call and then fails.
pub fn failing_unit(id: &str, recorder: &Recorder) -> MigrationUnit {
    let owned = id.to_string();
    let sink = recorder.clone();
    MigrationUnit::new(id)
        .with_up(Operation::sync(move |params| {
            sink.record(&owned, MigrationDirection::Up, params);
            anyhow::bail!("relation \"users\" already exists")
        }))
        .with_down(recording_operation(id, MigrationDirection::Down, recorder))
}

/// Migrator over recorded units backed by the given store.
pub fn migrator_with_store(
    ids: &[&str],
    recorder: &Recorder,
    store: Arc<dyn StateStore>,
) -> Migrator {
    let units = ids.iter().map(|id| recorded_unit(id, recorder)).collect();
    Migrator::new(
        MigratorConfig::default().with_shared_storage(store),
        StaticSource::new(units),
    )
}

/// Migrator over recorded units backed by a fresh in-memory store.
pub fn migrator(ids: &[&str], recorder: &Recorder) -> Migrator {
    migrator_with_store(ids, recorder, Arc::new(MemoryStore::new()))
}

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}
