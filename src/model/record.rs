use std::fmt;

use serde::{de::DeserializeOwned, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{DirtyFields, Model, ModelType};
use crate::error::{ModelError, ModelResult};

/// An instance of a model type: ordered field values plus write tracking.
///
/// The identifier stays null until the first successful persist and never
/// changes afterwards.
#[derive(Debug, Clone)]
pub struct Record {
    model: &'static ModelType,
    values: Map<String, Value>,
    dirty: DirtyFields,
}

impl Record {
    /// A new, never-persisted record with no field values.
    pub fn new(model: &'static ModelType) -> Self {
        Self {
            model,
            values: Map::new(),
            dirty: DirtyFields::new(),
        }
    }

    pub fn of<M: Model>() -> Self {
        Self::new(M::model_type())
    }

    /// Wrap a row read back from storage. Nothing is dirty.
    pub(crate) fn materialize(model: &'static ModelType, values: Map<String, Value>) -> Self {
        Self {
            model,
            values,
            dirty: DirtyFields::new(),
        }
    }

    /// Build a new record from a typed model value.
    ///
    /// Every field is written through [`Record::set`], so the record is fully
    /// dirty. A non-null identifier is rejected.
    pub fn from_model<M: Model + Serialize>(value: &M) -> ModelResult<Self> {
        let model = M::model_type();
        let fields = match serde_json::to_value(value)? {
            Value::Object(fields) => fields,
            other => {
                return Err(ModelError::Validation(format!(
                    "{} must serialize to an object, got {}",
                    model.name(),
                    other
                )))
            }
        };

        let mut record = Self::new(model);
        for (field, value) in fields {
            if field == model.id_field() {
                if !value.is_null() {
                    return Err(ModelError::Validation(format!(
                        "{}.{} is assigned by storage",
                        model.name(),
                        field
                    )));
                }
                continue;
            }
            record.set(field, value)?;
        }
        Ok(record)
    }

    /// Deserialize the field values into a typed model value.
    pub fn decode<T: DeserializeOwned>(&self) -> ModelResult<T> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    pub fn model(&self) -> &'static ModelType {
        self.model
    }

    pub fn type_name(&self) -> &'static str {
        self.model.name()
    }

    /// The identifier, or `None` until the record has been persisted.
    pub fn id(&self) -> Option<&Value> {
        self.values
            .get(self.model.id_field())
            .filter(|id| !id.is_null())
    }

    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Write a field and mark it dirty.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> ModelResult<()> {
        let field = field.into();
        if field == self.model.id_field() {
            return Err(ModelError::Validation(format!(
                "{}.{} is assigned by storage",
                self.model.name(),
                field
            )));
        }
        if !self.model.has_field(&field) {
            return Err(ModelError::Validation(format!(
                "{} has no field {}",
                self.model.name(),
                field
            )));
        }

        self.values.insert(field.clone(), value.into());
        self.dirty.mark(field);
        Ok(())
    }

    /// Write several fields, stopping at the first rejected one.
    pub fn fill(&mut self, fields: Map<String, Value>) -> ModelResult<()> {
        for (field, value) in fields {
            self.set(field, value)?;
        }
        Ok(())
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Distinct fields written since the last persist.
    pub fn dirty_fields(&self) -> Vec<&str> {
        self.dirty.resolve(&self.values)
    }

    pub(crate) fn dirty(&self) -> &DirtyFields {
        &self.dirty
    }

    /// The persisted view of the record: stored fields only.
    pub(crate) fn stored_snapshot(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(field, _)| self.model.is_stored(field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// Record a successful persist: assign the identifier if the record had
    /// none and reset write tracking.
    ///
    /// On the first persist, stored fields never written become `null`, which
    /// is how every backend stores them.
    pub(crate) fn mark_persisted(&mut self, id: Value) {
        if self.is_new() {
            self.values.insert(self.model.id_field().to_string(), id);
            for field in self.model.stored_fields() {
                if !self.values.contains_key(field) {
                    self.values.insert(field.to_string(), Value::Null);
                }
            }
        }
        self.dirty.clear();
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.values == other.values
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.values).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use serde::Deserialize;
    use serde_json::json;

    struct Post;

    impl Model for Post {
        fn model_type() -> &'static ModelType {
            static POST: ModelType = ModelType::new(
                "Post",
                &[
                    Field::stored("id"),
                    Field::stored("label"),
                    Field::stored("body"),
                    Field::transient("preview"),
                ],
            );
            &POST
        }
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct PostData {
        id: Option<i64>,
        label: String,
    }

    impl Model for PostData {
        fn model_type() -> &'static ModelType {
            Post::model_type()
        }
    }

    #[test]
    fn new_record_has_no_id() {
        let record = Record::of::<Post>();
        assert!(record.id().is_none());
        assert!(record.is_new());
        assert!(!record.is_dirty());
    }

    #[test]
    fn set_tracks_dirty_fields() {
        let mut record = Record::of::<Post>();
        record.set("label", "x").unwrap();
        record.set("body", "hello").unwrap();
        record.set("label", "y").unwrap();

        assert_eq!(record.get("label"), Some(&json!("y")));
        assert_eq!(record.dirty_fields(), vec!["label", "body"]);
    }

    #[test]
    fn identifier_writes_are_rejected() {
        let mut record = Record::of::<Post>();
        let err = record.set("id", 4).unwrap_err();
        assert!(matches!(err, ModelError::Validation(_)));
        assert!(!record.is_dirty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut record = Record::of::<Post>();
        let err = record.set("title", "x").unwrap_err();
        assert!(matches!(err, ModelError::Validation(ref msg) if msg.contains("title")));
    }

    #[test]
    fn mark_persisted_assigns_id_once() {
        let mut record = Record::of::<Post>();
        record.set("label", "x").unwrap();
        record.mark_persisted(json!(1));
        assert_eq!(record.id(), Some(&json!(1)));
        assert!(!record.is_dirty());

        record.mark_persisted(json!(2));
        assert_eq!(record.id(), Some(&json!(1)));
    }

    #[test]
    fn first_persist_nulls_unwritten_stored_fields() {
        let mut record = Record::of::<Post>();
        record.set("label", "x").unwrap();
        record.mark_persisted(json!(1));
        assert_eq!(record.get("body"), Some(&Value::Null));
        assert_eq!(record.get("preview"), None);
    }

    #[test]
    fn snapshot_skips_transient_fields() {
        let mut record = Record::of::<Post>();
        record.set("label", "x").unwrap();
        record.set("preview", "x...").unwrap();
        let snapshot = record.stored_snapshot();
        assert!(snapshot.contains_key("label"));
        assert!(!snapshot.contains_key("preview"));
    }

    #[test]
    fn typed_round_trip() {
        let data = PostData {
            id: None,
            label: "typed".into(),
        };
        let mut record = Record::from_model(&data).unwrap();
        assert_eq!(record.dirty_fields(), vec!["label"]);

        record.mark_persisted(json!(9));
        let decoded: PostData = record.decode().unwrap();
        assert_eq!(decoded.id, Some(9));
        assert_eq!(decoded.label, "typed");
    }

    #[test]
    fn from_model_rejects_assigned_id() {
        let data = PostData {
            id: Some(3),
            label: "x".into(),
        };
        assert!(matches!(
            Record::from_model(&data),
            Err(ModelError::Validation(_))
        ));
    }

    #[test]
    fn displays_as_json_fields() {
        let mut record = Record::of::<Post>();
        record.set("label", "x").unwrap();
        assert_eq!(record.to_string(), r#"{"label":"x"}"#);
    }
}
