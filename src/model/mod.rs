//! Models - typed records with a persistence lifecycle.
//!
//! A model type is described by a [`ModelType`]: its name, identifier field
//! and ordered field table. Instances are [`Record`]s, which hold the field
//! values in an ordered map and track which fields were written since the last
//! persist. Persistence goes through a [`ModelRepository`] bound to a storage
//! backend.
//!
//! ## Example
//!
//! ```ignore
//! use active_record_rs::{Model, ModelsExt, SessionStorage};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize, Model)]
//! struct Post {
//!     pub id: Option<String>,
//!     pub label: String,
//! }
//!
//! let storage = Arc::new(SessionStorage::new());
//! let posts = storage.models::<Post>();
//! let mut post = posts.new_record();
//! post.set("label", "x")?;
//! let id = posts.save(&mut post)?;
//! let loaded = posts.find(id)?;
//! ```

mod dirty;
mod record;
mod repository;

use crate::inflect;

/// A field in a model type's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    /// Transient fields live on the record but are never persisted.
    pub transient: bool,
}

impl Field {
    pub const fn stored(name: &'static str) -> Self {
        Self {
            name,
            transient: false,
        }
    }

    pub const fn transient(name: &'static str) -> Self {
        Self {
            name,
            transient: true,
        }
    }
}

/// Descriptor of a model type: name, identifier field and field table.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelType {
    name: &'static str,
    id_field: &'static str,
    fields: &'static [Field],
}

impl ModelType {
    /// A model type whose identifier field is `"id"`.
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self {
            name,
            id_field: "id",
            fields,
        }
    }

    pub const fn with_id_field(self, id_field: &'static str) -> Self {
        Self { id_field, ..self }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id_field(&self) -> &'static str {
        self.id_field
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True for declared fields and for the identifier field.
    pub fn has_field(&self, name: &str) -> bool {
        name == self.id_field || self.field(name).is_some()
    }

    pub fn is_stored(&self, name: &str) -> bool {
        name == self.id_field || self.field(name).is_some_and(|f| !f.transient)
    }

    /// Persisted field names in declaration order, identifier included.
    pub fn stored_fields(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .fields
            .iter()
            .filter(|f| !f.transient)
            .map(|f| f.name)
            .collect();
        if !names.contains(&self.id_field) {
            names.insert(0, self.id_field);
        }
        names
    }

    /// The pluralized, lower-cased type name.
    pub fn table_name(&self) -> String {
        inflect::table_name(self.name)
    }
}

/// Types that describe a model. Usually derived with `#[derive(Model)]`.
pub trait Model: 'static {
    fn model_type() -> &'static ModelType;
}

pub use dirty::DirtyFields;
pub use record::Record;
pub use repository::{ModelRepository, ModelsExt};
