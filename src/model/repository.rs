//! ModelRepository - finders and persistence for one model type.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{Model, ModelType, Record};
use crate::collection::{Collection, LazyCollection};
use crate::criteria::Criteria;
use crate::error::{ModelError, ModelResult};
use crate::storage::{Changeset, StorageBackend};

/// Repository bound to one model type and the backend serving it.
///
/// Cheap to clone: clones share the backend.
#[derive(Clone)]
pub struct ModelRepository {
    model: &'static ModelType,
    backend: Arc<dyn StorageBackend>,
}

impl ModelRepository {
    pub fn new(model: &'static ModelType, backend: Arc<dyn StorageBackend>) -> Self {
        Self { model, backend }
    }

    pub fn model(&self) -> &'static ModelType {
        self.model
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    /// A new, unsaved record of this model type.
    pub fn new_record(&self) -> Record {
        Record::new(self.model)
    }

    /// Build a record from `fields`, saving it when `save` is true.
    pub fn create(&self, fields: Map<String, Value>, save: bool) -> ModelResult<Record> {
        let mut record = self.new_record();
        record.fill(fields)?;
        if save {
            self.save(&mut record)?;
        }
        Ok(record)
    }

    /// Like [`create`](Self::create), but fields the model does not declare
    /// are skipped instead of rejected.
    pub fn create_passive(&self, fields: Map<String, Value>, save: bool) -> ModelResult<Record> {
        let model = self.model;
        let (known, skipped): (Map<String, Value>, Map<String, Value>) = fields
            .into_iter()
            .partition(|(field, _)| model.has_field(field));
        if !skipped.is_empty() {
            tracing::trace!(
                model = model.name(),
                skipped = skipped.len(),
                "ignoring undeclared fields"
            );
        }
        self.create(known, save)
    }

    /// Write `fields` onto an existing record, saving it when `save` is true.
    pub fn update(
        &self,
        record: &mut Record,
        fields: Map<String, Value>,
        save: bool,
    ) -> ModelResult<()> {
        self.check_type(record)?;
        record.fill(fields)?;
        if save {
            self.save(record)?;
        }
        Ok(())
    }

    /// Find a record by identifier.
    pub fn find(&self, id: impl Into<Value>) -> ModelResult<Option<Record>> {
        let id = id.into();
        let row = self.backend.find(self.model, &id)?;
        Ok(row.map(|row| Record::materialize(self.model, row)))
    }

    /// Every record matching `criteria`, in backend result order.
    pub fn find_by(&self, criteria: &Criteria) -> ModelResult<Collection> {
        let records = self.find_by_with(criteria, |record| record)?;
        Ok(Collection::from_matching(self.model, records))
    }

    /// Pass every record matching `criteria` through `f`, in result order,
    /// and collect what it returns.
    pub fn find_by_with<T, F>(&self, criteria: &Criteria, mut f: F) -> ModelResult<Vec<T>>
    where
        F: FnMut(Record) -> T,
    {
        let model = self.model;
        let mut out = Vec::new();
        self.backend.scan(model, criteria, &mut |row| {
            out.push(f(Record::materialize(model, row)));
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    /// The first record matching `criteria`.
    pub fn find_one_by(&self, criteria: &Criteria) -> ModelResult<Option<Record>> {
        let model = self.model;
        let mut found = None;
        self.backend.scan(model, criteria, &mut |row| {
            found = Some(Record::materialize(model, row));
            ControlFlow::Break(())
        })?;
        Ok(found)
    }

    pub fn all(&self) -> ModelResult<Collection> {
        self.find_by(&Criteria::new())
    }

    pub fn all_with<T, F>(&self, f: F) -> ModelResult<Vec<T>>
    where
        F: FnMut(Record) -> T,
    {
        self.find_by_with(&Criteria::new(), f)
    }

    /// Persist the record's changes and return its identifier.
    ///
    /// A first save with nothing written stores every stored field present on
    /// the record. A saved record with nothing written issues no write.
    pub fn save(&self, record: &mut Record) -> ModelResult<Value> {
        self.check_type(record)?;

        let model = self.model;
        let snapshot = record.stored_snapshot();
        let id = record.id().cloned();

        let fields: Vec<&str> = if record.dirty().is_empty() {
            match &id {
                Some(id) => {
                    tracing::debug!(model = model.name(), %id, "nothing to save");
                    return Ok(id.clone());
                }
                None => model
                    .stored_fields()
                    .into_iter()
                    .filter(|field| *field != model.id_field() && snapshot.contains_key(*field))
                    .collect(),
            }
        } else {
            record
                .dirty()
                .resolve(&snapshot)
                .into_iter()
                .filter(|field| *field != model.id_field())
                .collect()
        };

        let saved_id = match &id {
            Some(id) if fields.is_empty() => id.clone(),
            _ => {
                let changes = Changeset {
                    id: id.as_ref(),
                    values: &snapshot,
                    fields: &fields,
                };
                let saved_id = self.backend.save(model, &changes)?;
                tracing::debug!(
                    model = model.name(),
                    backend = self.backend.name(),
                    id = %saved_id,
                    fields = fields.len(),
                    "saved record"
                );
                saved_id
            }
        };

        record.mark_persisted(saved_id.clone());
        Ok(saved_id)
    }

    /// Delete the record. A record that was never saved deletes as a no-op.
    pub fn delete(&self, record: &Record) -> ModelResult<bool> {
        self.check_type(record)?;
        self.backend.delete(self.model, record.id())
    }

    /// An empty lazy collection resolving through this repository.
    pub fn lazy(&self) -> LazyCollection {
        LazyCollection::new(self.clone())
    }

    /// A lazy collection of unresolved identifiers.
    pub fn lazy_from_ids<I>(&self, ids: I) -> ModelResult<LazyCollection>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let mut lazy = self.lazy();
        for id in ids {
            lazy.push(id.into())?;
        }
        Ok(lazy)
    }

    fn check_type(&self, record: &Record) -> ModelResult<()> {
        if record.model() == self.model {
            Ok(())
        } else {
            Err(ModelError::TypeMismatch {
                expected: self.model.name().to_string(),
                found: record.type_name().to_string(),
            })
        }
    }
}

impl fmt::Debug for ModelRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRepository")
            .field("model", &self.model.name())
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Typed repository access on anything that can hand out a backend.
pub trait ModelsExt {
    fn repository(&self, model: &'static ModelType) -> ModelRepository;

    fn models<M: Model>(&self) -> ModelRepository {
        self.repository(M::model_type())
    }
}
