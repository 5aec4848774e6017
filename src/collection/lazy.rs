//! LazyCollection - identifiers resolved to records on first read.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

use super::{check_member, write_listing, Collection};
use crate::error::{ModelError, ModelResult};
use crate::model::{ModelRepository, ModelType, Record};
use crate::storage::{id_key, json_type};

/// One position of a lazy collection.
///
/// `Unresolved` becomes `Resolved` on read or preload and never goes back.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Unresolved(Value),
    Resolved(Record),
}

impl Slot {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Resolved(_))
    }

    /// The identifier this slot stands for; `null` for a resolved record that
    /// was never saved.
    pub fn id(&self) -> Value {
        match self {
            Slot::Unresolved(id) => id.clone(),
            Slot::Resolved(record) => record.id().cloned().unwrap_or(Value::Null),
        }
    }
}

/// What can be inserted into a lazy collection: an identifier or a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Id(Value),
    Record(Record),
}

impl From<Record> for Member {
    fn from(record: Record) -> Self {
        Member::Record(record)
    }
}

impl From<Value> for Member {
    fn from(id: Value) -> Self {
        Member::Id(id)
    }
}

impl From<i64> for Member {
    fn from(id: i64) -> Self {
        Member::Id(id.into())
    }
}

impl From<u64> for Member {
    fn from(id: u64) -> Self {
        Member::Id(id.into())
    }
}

impl From<i32> for Member {
    fn from(id: i32) -> Self {
        Member::Id(id.into())
    }
}

impl From<&str> for Member {
    fn from(id: &str) -> Self {
        Member::Id(id.into())
    }
}

impl From<String> for Member {
    fn from(id: String) -> Self {
        Member::Id(id.into())
    }
}

/// An ordered list of identifier-or-record slots of one model type.
///
/// Reading a slot with [`LazyCollection::get`] looks the identifier up
/// through the repository and keeps the record in the slot. Display and
/// serialization render identifiers only and never touch storage.
#[derive(Debug, Clone)]
pub struct LazyCollection {
    repository: ModelRepository,
    slots: Vec<Slot>,
}

impl LazyCollection {
    pub fn new(repository: ModelRepository) -> Self {
        Self {
            repository,
            slots: Vec::new(),
        }
    }

    pub fn model(&self) -> &'static ModelType {
        self.repository.model()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn to_slot(&self, member: Member) -> ModelResult<Slot> {
        match member {
            Member::Record(record) => {
                check_member(self.model(), &record)?;
                Ok(Slot::Resolved(record))
            }
            Member::Id(id) if id.is_string() || id.is_number() => Ok(Slot::Unresolved(id)),
            Member::Id(other) => Err(ModelError::TypeMismatch {
                expected: format!("{} or identifier", self.model().name()),
                found: json_type(&other).to_string(),
            }),
        }
    }

    pub fn push(&mut self, member: impl Into<Member>) -> ModelResult<()> {
        let slot = self.to_slot(member.into())?;
        self.slots.push(slot);
        Ok(())
    }

    /// Replace the slot at `index`; `index == len` appends.
    pub fn set(&mut self, index: usize, member: impl Into<Member>) -> ModelResult<()> {
        let slot = self.to_slot(member.into())?;
        let len = self.slots.len();
        match index {
            i if i < len => self.slots[i] = slot,
            i if i == len => self.slots.push(slot),
            _ => return Err(ModelError::IndexOutOfBounds { index, len }),
        }
        Ok(())
    }

    /// The record at `index`, resolving it first if needed.
    ///
    /// Returns `None` when storage has no record for the slot's identifier;
    /// the slot then stays unresolved.
    pub fn get(&mut self, index: usize) -> ModelResult<Option<&Record>> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get(index)
            .ok_or(ModelError::IndexOutOfBounds { index, len })?;

        if let Slot::Unresolved(id) = slot {
            let id = id.clone();
            self.resolve(index, id)?;
        }

        match &self.slots[index] {
            Slot::Resolved(record) => Ok(Some(record)),
            Slot::Unresolved(_) => Ok(None),
        }
    }

    /// The slot at `index` as it is now, without resolving it.
    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Slot::is_resolved)
    }

    /// Resolve every unresolved slot in the inclusive range `start..=end`.
    ///
    /// The range is clamped to the collection; slots outside it are untouched.
    pub fn preload(&mut self, start: usize, end: usize) -> ModelResult<()> {
        if self.slots.is_empty() || start > end {
            return Ok(());
        }
        let end = end.min(self.slots.len() - 1);
        tracing::debug!(model = self.model().name(), start, end, "preloading lazy slots");

        for index in start..=end {
            if let Slot::Unresolved(id) = &self.slots[index] {
                let id = id.clone();
                self.resolve(index, id)?;
            }
        }
        Ok(())
    }

    /// Identifiers of every slot, in order, without resolving anything.
    pub fn ids(&self) -> Vec<Value> {
        self.slots.iter().map(Slot::id).collect()
    }

    /// Resolve every slot and return the records as an eager collection.
    ///
    /// Identifiers with no stored record are left out.
    pub fn into_collection(mut self) -> ModelResult<Collection> {
        if !self.slots.is_empty() {
            self.preload(0, self.slots.len() - 1)?;
        }
        let records = self
            .slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Resolved(record) => Some(record),
                Slot::Unresolved(_) => None,
            })
            .collect();
        Ok(Collection::from_matching(self.repository.model(), records))
    }

    fn resolve(&mut self, index: usize, id: Value) -> ModelResult<bool> {
        match self.repository.find(id.clone())? {
            Some(record) => {
                tracing::trace!(model = self.model().name(), index, %id, "resolved lazy slot");
                self.slots[index] = Slot::Resolved(record);
                Ok(true)
            }
            None => {
                tracing::warn!(model = self.model().name(), index, %id, "no record for lazy slot");
                Ok(false)
            }
        }
    }
}

impl fmt::Display for LazyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_listing(
            f,
            self.model().name(),
            self.slots.len(),
            self.ids().iter().map(id_key),
        )
    }
}

impl Serialize for LazyCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.ids().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, ModelsExt};
    use crate::storage::SessionStorage;
    use serde_json::json;
    use std::sync::Arc;

    static POST: ModelType = ModelType::new("Post", &[Field::stored("id"), Field::stored("label")]);
    static AUTHOR: ModelType = ModelType::new("Author", &[Field::stored("id")]);

    fn saved_posts(labels: &[&str]) -> (ModelRepository, Vec<Value>) {
        let posts = Arc::new(SessionStorage::new()).repository(&POST);
        let ids = labels
            .iter()
            .map(|label| {
                let mut post = posts.new_record();
                post.set("label", *label).unwrap();
                posts.save(&mut post).unwrap()
            })
            .collect();
        (posts, ids)
    }

    #[test]
    fn get_resolves_only_the_read_slot() {
        let (posts, ids) = saved_posts(&["a", "b", "c"]);
        let mut lazy = posts.lazy_from_ids(ids.clone()).unwrap();

        let record = lazy.get(1).unwrap().unwrap();
        assert_eq!(record.id(), Some(&ids[1]));
        assert!(!lazy.is_resolved(0));
        assert!(lazy.is_resolved(1));
        assert!(!lazy.is_resolved(2));
    }

    #[test]
    fn preload_clamps_to_length() {
        let (posts, ids) = saved_posts(&["a", "b"]);
        let mut lazy = posts.lazy_from_ids(ids).unwrap();
        lazy.preload(1, 10).unwrap();
        assert!(!lazy.is_resolved(0));
        assert!(lazy.is_resolved(1));

        lazy.preload(1, 0).unwrap();
        assert!(!lazy.is_resolved(0));
    }

    #[test]
    fn missing_ids_stay_unresolved() {
        let (posts, _) = saved_posts(&[]);
        let mut lazy = posts.lazy_from_ids(["nope"]).unwrap();
        assert!(lazy.get(0).unwrap().is_none());
        assert_eq!(lazy.slot(0), Some(&Slot::Unresolved(json!("nope"))));
    }

    #[test]
    fn out_of_range_get_is_an_error() {
        let (posts, _) = saved_posts(&[]);
        let mut lazy = posts.lazy();
        assert_eq!(
            lazy.get(0).unwrap_err(),
            ModelError::IndexOutOfBounds { index: 0, len: 0 }
        );
    }

    #[test]
    fn rejects_foreign_records_and_non_identifiers() {
        let (posts, _) = saved_posts(&[]);
        let mut lazy = posts.lazy();

        let err = lazy.push(Record::new(&AUTHOR)).unwrap_err();
        assert_eq!(
            err,
            ModelError::TypeMismatch {
                expected: "Post".into(),
                found: "Author".into()
            }
        );

        let err = lazy.push(json!([1, 2])).unwrap_err();
        assert_eq!(
            err,
            ModelError::TypeMismatch {
                expected: "Post or identifier".into(),
                found: "array".into()
            }
        );
        assert!(lazy.push(Value::Null).is_err());
        assert!(lazy.is_empty());
    }

    #[test]
    fn rendering_never_resolves() {
        let (posts, _) = saved_posts(&[]);
        let mut lazy = posts.lazy();
        lazy.push(5).unwrap();
        lazy.push("abc").unwrap();

        assert_eq!(lazy.to_string(), "Post[2]{ 5, abc }");
        assert_eq!(serde_json::to_value(&lazy).unwrap(), json!([5, "abc"]));
        assert!(!lazy.is_resolved(0));
        assert!(!lazy.is_resolved(1));
    }

    #[test]
    fn into_collection_resolves_everything() {
        let (posts, ids) = saved_posts(&["a", "b"]);
        let mut lazy = posts.lazy_from_ids(ids).unwrap();
        lazy.push("missing").unwrap();

        let collection = lazy.into_collection().unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get(1).unwrap().get("label"), Some(&json!("b")));
    }
}
