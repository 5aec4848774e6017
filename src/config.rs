//! Declarative storage wiring.
//!
//! ```json
//! { "default": { "kind": "session" },
//!   "models": { "Post": { "kind": "database", "path": "blog.db" },
//!               "Draft": { "kind": "file", "directory": "var/drafts" } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::storage::{FileStorage, NullStorage, SessionStorage, StorageBackend, StorageManager};

/// One backend, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// SQLite database; no `path` means a private in-memory database.
    Database {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    File {
        directory: PathBuf,
    },
    Session,
    Null,
}

impl BackendConfig {
    fn build(&self) -> ModelResult<Arc<dyn StorageBackend>> {
        let backend: Arc<dyn StorageBackend> = match self {
            BackendConfig::Database { path } => open_database(path.as_deref())?,
            BackendConfig::File { directory } => {
                Arc::new(FileStorage::with_directory(directory.clone()))
            }
            BackendConfig::Session => Arc::new(SessionStorage::new()),
            BackendConfig::Null => Arc::new(NullStorage),
        };
        Ok(backend)
    }
}

#[cfg(feature = "database")]
fn open_database(path: Option<&Path>) -> ModelResult<Arc<dyn StorageBackend>> {
    use crate::storage::DatabaseStorage;

    let storage = match path {
        Some(path) => DatabaseStorage::open(path)?,
        None => DatabaseStorage::open_in_memory()?,
    };
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "database"))]
fn open_database(_path: Option<&Path>) -> ModelResult<Arc<dyn StorageBackend>> {
    Err(ModelError::Configuration(
        "database storage requires the `database` feature".to_string(),
    ))
}

/// Which backend serves which model type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend for model types not listed in `models`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<BackendConfig>,
    #[serde(default)]
    pub models: BTreeMap<String, BackendConfig>,
}

impl StorageConfig {
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        serde_json::from_str(json).map_err(|e| ModelError::Configuration(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> ModelResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Open every configured backend and register it.
    ///
    /// Entries that are written identically share one backend instance.
    pub fn build(&self) -> ModelResult<StorageManager> {
        let entries = self
            .default
            .iter()
            .map(|config| (None, config))
            .chain(
                self.models
                    .iter()
                    .map(|(model, config)| (Some(model.as_str()), config)),
            );

        let mut built: Vec<(&BackendConfig, Arc<dyn StorageBackend>)> = Vec::new();
        let mut manager = StorageManager::new();
        for (model, config) in entries {
            let backend = match built.iter().find(|(seen, _)| *seen == config) {
                Some((_, backend)) => Arc::clone(backend),
                None => {
                    let backend = config.build()?;
                    built.push((config, Arc::clone(&backend)));
                    backend
                }
            };
            match model {
                Some(model) => manager.attach_named(model, backend),
                None => manager.set_default(backend),
            };
        }

        tracing::info!(
            models = self.models.len(),
            default = self.default.is_some(),
            "storage configured"
        );
        Ok(manager)
    }
}
