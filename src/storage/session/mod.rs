//! SessionStorage - records kept in the active session's key-value store.

mod store;

use std::ops::ControlFlow;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::{id_key, snapshot_with_id, Changeset, Row, StorageBackend};
use crate::criteria::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::model::ModelType;

pub use store::{InMemorySession, SessionStore};

/// Backend storing one serialized snapshot per record in a [`SessionStore`].
///
/// Storage key is `"TypeName:id"`. Without a configured store, an empty
/// [`InMemorySession`] is created on first use.
#[derive(Default)]
pub struct SessionStorage {
    store: RwLock<Option<Arc<dyn SessionStore>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store: RwLock::new(Some(store)),
        }
    }

    /// Replace the session store, e.g. when a new session begins.
    pub fn set_store(&self, store: Arc<dyn SessionStore>) -> ModelResult<()> {
        let mut slot = self
            .store
            .write()
            .map_err(|_| ModelError::LockPoisoned("session store write"))?;
        *slot = Some(store);
        Ok(())
    }

    fn store(&self) -> ModelResult<Arc<dyn SessionStore>> {
        {
            let slot = self
                .store
                .read()
                .map_err(|_| ModelError::LockPoisoned("session store read"))?;
            if let Some(store) = slot.as_ref() {
                return Ok(store.clone());
            }
        }

        let mut slot = self
            .store
            .write()
            .map_err(|_| ModelError::LockPoisoned("session store write"))?;
        let store = slot.get_or_insert_with(|| {
            tracing::debug!("initializing empty in-memory session");
            Arc::new(InMemorySession::new()) as Arc<dyn SessionStore>
        });
        Ok(store.clone())
    }

    fn make_key(model: &ModelType, id: &Value) -> String {
        format!("{}:{}", model.name(), id_key(id))
    }
}

impl StorageBackend for SessionStorage {
    fn name(&self) -> &'static str {
        "session"
    }

    fn save(&self, model: &ModelType, changes: &Changeset<'_>) -> ModelResult<Value> {
        let store = self.store()?;
        let id = match changes.id {
            Some(id) => id.clone(),
            None => Value::String(Uuid::now_v7().simple().to_string()),
        };

        let row = snapshot_with_id(model, changes, &id);
        let key = Self::make_key(model, &id);
        store.put(&key, serde_json::to_vec(&row)?)?;
        tracing::debug!(model = model.name(), %key, "stored session record");
        Ok(id)
    }

    fn delete(&self, model: &ModelType, id: Option<&Value>) -> ModelResult<bool> {
        let Some(id) = id else {
            return Ok(true);
        };
        let key = Self::make_key(model, id);
        let existed = self.store()?.remove(&key)?;
        tracing::debug!(model = model.name(), %key, existed, "removed session record");
        Ok(existed)
    }

    fn find(&self, model: &ModelType, id: &Value) -> ModelResult<Option<Row>> {
        let key = Self::make_key(model, id);
        match self.store()?.get(&key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan(
        &self,
        model: &ModelType,
        criteria: &Criteria,
        visit: &mut dyn FnMut(Row) -> ControlFlow<()>,
    ) -> ModelResult<()> {
        let prefix = format!("{}:", model.name());
        for (_, bytes) in self.store()?.entries(&prefix)? {
            let row: Row = serde_json::from_slice(&bytes)?;
            if criteria.matches(&row) && visit(row).is_break() {
                break;
            }
        }
        Ok(())
    }
}
