//! FileStorage - one JSON file per record.
//!
//! Layout: `<root>/<table_name>/<id>.json`. Identifiers are time-ordered
//! tokens, so listing a directory in file-name order yields records in
//! creation order.

use std::fs;
use std::io::ErrorKind;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use super::{id_key, snapshot_with_id, Changeset, Row, StorageBackend};
use crate::criteria::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

const EXTENSION: &str = "json";

/// Backend writing each record as a full snapshot file under a root directory.
#[derive(Debug, Default)]
pub struct FileStorage {
    root: RwLock<Option<PathBuf>>,
}

impl FileStorage {
    /// An unconfigured backend. Every operation fails until
    /// [`FileStorage::set_directory`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(root: impl Into<PathBuf>) -> Self {
        Self {
            root: RwLock::new(Some(root.into())),
        }
    }

    pub fn set_directory(&self, root: impl Into<PathBuf>) -> ModelResult<()> {
        let mut slot = self
            .root
            .write()
            .map_err(|_| ModelError::LockPoisoned("file root write"))?;
        *slot = Some(root.into());
        Ok(())
    }

    /// The directory holding records of `model`.
    pub fn directory_for(&self, model: &ModelType) -> ModelResult<PathBuf> {
        let slot = self
            .root
            .read()
            .map_err(|_| ModelError::LockPoisoned("file root read"))?;
        match slot.as_ref() {
            Some(root) => Ok(root.join(model.table_name())),
            None => Err(ModelError::Configuration(format!(
                "no directory set for {} file storage",
                model.name()
            ))),
        }
    }

    /// Path of the record file, or `None` for identifiers that cannot name a file.
    fn record_path(dir: &Path, id: &Value) -> Option<PathBuf> {
        let name = id_key(id);
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(&['/', '\\', '\0'][..]);
        valid.then(|| dir.join(format!("{}.{}", name, EXTENSION)))
    }

    fn read_row(path: &Path) -> ModelResult<Option<Row>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Write through a temporary file so a record is replaced whole or not at all.
    fn write_row(path: &Path, row: &Row) -> ModelResult<()> {
        let bytes = serde_json::to_vec_pretty(row)?;
        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    fn save(&self, model: &ModelType, changes: &Changeset<'_>) -> ModelResult<Value> {
        let dir = self.directory_for(model)?;
        fs::create_dir_all(&dir)?;

        let id = match changes.id {
            Some(id) => id.clone(),
            None => Value::String(Uuid::now_v7().simple().to_string()),
        };
        let path = Self::record_path(&dir, &id).ok_or_else(|| {
            ModelError::Validation(format!("{} cannot be used as a file name", id))
        })?;

        Self::write_row(&path, &snapshot_with_id(model, changes, &id))?;
        tracing::debug!(model = model.name(), path = %path.display(), "wrote record file");
        Ok(id)
    }

    fn delete(&self, model: &ModelType, id: Option<&Value>) -> ModelResult<bool> {
        let dir = self.directory_for(model)?;
        let Some(id) = id else {
            return Ok(true);
        };
        let Some(path) = Self::record_path(&dir, id) else {
            return Ok(false);
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(model = model.name(), path = %path.display(), "removed record file");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn find(&self, model: &ModelType, id: &Value) -> ModelResult<Option<Row>> {
        let dir = self.directory_for(model)?;
        match Self::record_path(&dir, id) {
            Some(path) => Self::read_row(&path),
            None => Ok(None),
        }
    }

    fn scan(
        &self,
        model: &ModelType,
        criteria: &Criteria,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()> {
        let dir = self.directory_for(model)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        tracing::debug!(model = model.name(), files = paths.len(), "scanning record files");

        for path in paths {
            // Removed since the directory was listed.
            let Some(row) = Self::read_row(&path)? else {
                continue;
            };
            if criteria.matches(&row) && visit(row).is_break() {
                break;
            }
        }
        Ok(())
    }
}
