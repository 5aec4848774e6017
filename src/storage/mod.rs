//! Storage - pluggable persistence media behind one backend trait.
//!
//! Every model type is served by one [`StorageBackend`]. The
//! [`StorageManager`] is the explicit registry mapping model types to
//! backends; a model type with nothing attached resolves to [`NullStorage`],
//! which fails every operation.

#[cfg(feature = "database")]
mod database;
mod file;
mod null;
mod session;

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::criteria::Criteria;
use crate::error::ModelResult;
use crate::model::{Model, ModelRepository, ModelType, ModelsExt};

/// A raw stored row: field name to value.
pub type Row = Map<String, Value>;

/// What a save hands to a backend.
#[derive(Debug, Clone, Copy)]
pub struct Changeset<'a> {
    /// Current identifier; `None` for a first save.
    pub id: Option<&'a Value>,
    /// Stored fields of the record as they are now.
    pub values: &'a Row,
    /// Fields written since the last persist, identifier excluded.
    pub fields: &'a [&'a str],
}

/// A persistence medium for records.
///
/// All operations block until complete. `scan` streams matching rows to the
/// visitor in result order; the visitor returns `ControlFlow::Break` to stop
/// early.
pub trait StorageBackend: Send + Sync {
    /// Short label for logs and errors.
    fn name(&self) -> &'static str;

    /// Insert (no id) or update (id present). Returns the record's identifier.
    fn save(&self, model: &ModelType, changes: &Changeset<'_>) -> ModelResult<Value>;

    /// Delete by identifier. A record that was never saved deletes as a no-op.
    fn delete(&self, model: &ModelType, id: Option<&Value>) -> ModelResult<bool>;

    fn find(&self, model: &ModelType, id: &Value) -> ModelResult<Option<Row>>;

    fn scan(
        &self,
        model: &ModelType,
        criteria: &Criteria,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()>;
}

/// Registry of the backend serving each model type.
#[derive(Default)]
pub struct StorageManager {
    backends: HashMap<String, Arc<dyn StorageBackend>>,
    fallback: Option<Arc<dyn StorageBackend>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve model type `M` from `backend`.
    pub fn attach<M: Model>(&mut self, backend: Arc<dyn StorageBackend>) -> &mut Self {
        self.attach_type(M::model_type(), backend)
    }

    pub fn attach_type(
        &mut self,
        model: &ModelType,
        backend: Arc<dyn StorageBackend>,
    ) -> &mut Self {
        self.attach_named(model.name(), backend)
    }

    /// Serve the model type called `name` from `backend`.
    pub fn attach_named(
        &mut self,
        name: impl Into<String>,
        backend: Arc<dyn StorageBackend>,
    ) -> &mut Self {
        let name = name.into();
        tracing::debug!(model = %name, backend = backend.name(), "attached storage");
        self.backends.insert(name, backend);
        self
    }

    /// Serve every model type without its own backend from `backend`.
    pub fn set_default(&mut self, backend: Arc<dyn StorageBackend>) -> &mut Self {
        self.fallback = Some(backend);
        self
    }

    pub fn backend_for(&self, model: &ModelType) -> Arc<dyn StorageBackend> {
        self.backends
            .get(model.name())
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| Arc::new(NullStorage))
    }
}

impl fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut backends: Vec<(&str, &str)> = self
            .backends
            .iter()
            .map(|(model, backend)| (model.as_str(), backend.name()))
            .collect();
        backends.sort();
        f.debug_struct("StorageManager")
            .field("backends", &backends)
            .field("fallback", &self.fallback.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl ModelsExt for StorageManager {
    fn repository(&self, model: &'static ModelType) -> ModelRepository {
        ModelRepository::new(model, self.backend_for(model))
    }
}

impl<B: StorageBackend + 'static> ModelsExt for Arc<B> {
    fn repository(&self, model: &'static ModelType) -> ModelRepository {
        let backend: Arc<dyn StorageBackend> = self.clone();
        ModelRepository::new(model, backend)
    }
}

/// Canonical text form of an identifier, used in keys and file names.
pub(crate) fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// JSON type name of a value, for error messages.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Stored row for a save: the record's stored values with its identifier.
///
/// Stored fields the record never wrote are kept as `null`, the same as an
/// unset database column.
pub(crate) fn snapshot_with_id(model: &ModelType, changes: &Changeset<'_>, id: &Value) -> Row {
    let mut row = Row::new();
    row.insert(model.id_field().to_string(), id.clone());
    for (field, value) in changes.values {
        if field != model.id_field() {
            row.insert(field.clone(), value.clone());
        }
    }
    for field in model.stored_fields() {
        if !row.contains_key(field) {
            row.insert(field.to_string(), Value::Null);
        }
    }
    row
}

#[cfg(feature = "database")]
pub use database::{DatabaseStorage, Statement};
pub use file::FileStorage;
pub use null::NullStorage;
pub use session::{InMemorySession, SessionStorage, SessionStore};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::model::Field;

    static NOTE: ModelType = ModelType::new("Note", &[Field::stored("id"), Field::stored("text")]);

    #[test]
    fn unattached_models_use_null_storage() {
        let manager = StorageManager::new();
        let notes = manager.repository(&NOTE);
        let err = notes.find("n-1").unwrap_err();
        assert!(matches!(err, ModelError::Unimplemented { operation: "find", .. }));
    }

    #[test]
    fn default_backend_serves_unattached_models() {
        let mut manager = StorageManager::new();
        manager.set_default(Arc::new(SessionStorage::new()));
        assert_eq!(manager.backend_for(&NOTE).name(), "session");
    }

    #[test]
    fn attached_backend_wins_over_default() {
        let mut manager = StorageManager::new();
        manager
            .set_default(Arc::new(NullStorage))
            .attach_type(&NOTE, Arc::new(SessionStorage::new()));
        assert_eq!(manager.backend_for(&NOTE).name(), "session");
    }

    #[test]
    fn snapshots_hold_every_stored_field() {
        let values = Row::new();
        let changes = Changeset {
            id: None,
            values: &values,
            fields: &[],
        };
        let row = snapshot_with_id(&NOTE, &changes, &Value::from("n-1"));
        assert_eq!(row.get("id"), Some(&Value::from("n-1")));
        assert_eq!(row.get("text"), Some(&Value::Null));
    }

    #[test]
    fn id_keys_are_unquoted() {
        assert_eq!(id_key(&Value::from("abc")), "abc");
        assert_eq!(id_key(&Value::from(7)), "7");
    }
}
