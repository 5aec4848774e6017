//! Collections - ordered containers of records of one model type.
//!
//! [`Collection`] grows on demand, [`FixedCollection`] has a fixed number of
//! slots and [`LazyCollection`] holds identifiers until they are read.
//! All three reject records of any other model type at insertion time.
//!
//! Textual form: `"<TypeName>[<count>]{ <e1>, <e2>, ... }"`.

mod fixed;
mod lazy;

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::{Model, ModelType, Record};

pub use fixed::FixedCollection;
pub use lazy::{LazyCollection, Member, Slot};

/// Reject records that are not of the declared model type.
pub(crate) fn check_member(expected: &ModelType, record: &Record) -> ModelResult<()> {
    if record.model() == expected {
        Ok(())
    } else {
        Err(ModelError::TypeMismatch {
            expected: expected.name().to_string(),
            found: record.type_name().to_string(),
        })
    }
}

pub(crate) fn write_listing<I>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    count: usize,
    items: I,
) -> fmt::Result
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    write!(f, "{}[{}]{{ ", name, count)?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(" }")
}

/// A growable, ordered list of records of one model type.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    model: &'static ModelType,
    records: Vec<Record>,
}

impl Collection {
    pub fn new(model: &'static ModelType) -> Self {
        Self {
            model,
            records: Vec::new(),
        }
    }

    pub fn of<M: Model>() -> Self {
        Self::new(M::model_type())
    }

    /// Wrap records already known to be of `model`.
    pub(crate) fn from_matching(model: &'static ModelType, records: Vec<Record>) -> Self {
        Self { model, records }
    }

    pub fn from_records(model: &'static ModelType, records: Vec<Record>) -> ModelResult<Self> {
        for record in &records {
            check_member(model, record)?;
        }
        Ok(Self { model, records })
    }

    pub fn model(&self) -> &'static ModelType {
        self.model
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Record) -> ModelResult<()> {
        check_member(self.model, &record)?;
        self.records.push(record);
        Ok(())
    }

    /// Replace the record at `index`; `index == len` appends.
    pub fn set(&mut self, index: usize, record: Record) -> ModelResult<()> {
        check_member(self.model, &record)?;
        let len = self.records.len();
        match index {
            i if i < len => self.records[i] = record,
            i if i == len => self.records.push(record),
            _ => return Err(ModelError::IndexOutOfBounds { index, len }),
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Record> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Identifiers in order; `null` for records never saved.
    pub fn ids(&self) -> Vec<Value> {
        self.records
            .iter()
            .map(|record| record.id().cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_listing(f, self.model.name(), self.records.len(), &self.records)
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl IntoIterator for Collection {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
