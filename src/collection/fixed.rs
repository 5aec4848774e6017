use std::fmt;

use serde::{Serialize, Serializer};

use super::{check_member, write_listing, Collection};
use crate::error::{ModelError, ModelResult};
use crate::model::{Model, ModelType, Record};

/// A fixed number of optional record slots, all of one model type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedCollection {
    model: &'static ModelType,
    slots: Vec<Option<Record>>,
}

impl FixedCollection {
    pub fn new(model: &'static ModelType, size: usize) -> Self {
        Self {
            model,
            slots: vec![None; size],
        }
    }

    pub fn of<M: Model>(size: usize) -> Self {
        Self::new(M::model_type(), size)
    }

    pub fn model(&self) -> &'static ModelType {
        self.model
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn set(&mut self, index: usize, record: Record) -> ModelResult<()> {
        check_member(self.model, &record)?;
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ModelError::IndexOutOfBounds { index, len: size })?;
        *slot = Some(record);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Empty the slot at `index`, returning what it held.
    pub fn take(&mut self, index: usize) -> Option<Record> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Record>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// The occupied slots, in order, as a growable collection.
    pub fn into_collection(self) -> Collection {
        Collection::from_matching(self.model, self.slots.into_iter().flatten().collect())
    }
}

impl From<Collection> for FixedCollection {
    fn from(collection: Collection) -> Self {
        let model = collection.model();
        Self {
            model,
            slots: collection.into_records().into_iter().map(Some).collect(),
        }
    }
}

impl fmt::Display for FixedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self.slots.iter().map(|slot| match slot {
            Some(record) => record.to_string(),
            None => "null".to_string(),
        });
        write_listing(f, self.model.name(), self.slots.len(), items)
    }
}

impl Serialize for FixedCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.slots.serialize(serializer)
    }
}
