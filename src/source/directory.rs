use super::types::{LoadedMigration, MigrationUnit, SourceError};
use super::MigrationSource;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

type Loader = dyn Fn(&Path) -> anyhow::Result<LoadedMigration> + Send + Sync;

/// Migrations stored as files directly inside one directory.
///
/// Enumeration and pattern filtering happen here. Turning a file into
/// callable operations is delegated to the loader given at construction.
/// The unit id is the file name without its extension; the ledger records
/// the full file name.
#[derive(Clone)]
pub struct DirectorySource {
    root: PathBuf,
    loader: Option<Arc<Loader>>,
}

impl DirectorySource {
    pub fn new<F>(root: impl Into<PathBuf>, loader: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<LoadedMigration> + Send + Sync + 'static,
    {
        Self {
            root: root.into(),
            loader: Some(Arc::new(loader)),
        }
    }

    /// Source that only lists files. Every unit gets no-op operations,
    /// which is enough for `pending` and `executed` queries.
    pub fn listing(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loader: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files directly under the root whose name matches `pattern`,
    /// sorted by file name.
    pub fn matching_files(&self, pattern: &Regex) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::DirectoryNotFound(self.root.clone()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| SourceError::InvalidFileName(entry.path().to_path_buf()))?;

            if pattern.is_match(file_name) {
                files.push(entry.path().to_path_buf());
            } else {
                debug!(file = %file_name, "Skipping file that does not match migrations pattern");
            }
        }

        Ok(files)
    }
}

/// Id for a migration file: its name without the extension.
pub fn migration_id(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|stem| stem.to_str())
}

#[async_trait]
impl MigrationSource for DirectorySource {
    async fn migrations(&self, pattern: &Regex) -> Result<Vec<MigrationUnit>, SourceError> {
        let mut units = Vec::new();

        for path in self.matching_files(pattern)? {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| SourceError::InvalidFileName(path.clone()))?
                .to_string();
            let id = migration_id(&path)
                .ok_or_else(|| SourceError::InvalidFileName(path.clone()))?
                .to_string();

            let loaded = match &self.loader {
                Some(loader) => loader(path.as_path()).map_err(|cause| SourceError::LoadFailed {
                    file: file_name.clone(),
                    cause,
                })?,
                None => LoadedMigration::default(),
            };

            units.push(
                MigrationUnit::new(id)
                    .with_source_name(file_name)
                    .with_up(loaded.up)
                    .with_down(loaded.down),
            );
        }

        Ok(units)
    }
}

impl fmt::Debug for DirectorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySource")
            .field("root", &self.root)
            .field("loader", &self.loader.is_some())
            .finish()
    }
}
