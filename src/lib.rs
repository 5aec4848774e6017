//! Active-record models with pluggable storage.
//!
//! Records track which fields were written since their last persist and save
//! only those. Every model type is served by one [`StorageBackend`]: a SQLite
//! database, a directory of JSON files, a session key-value store, or the
//! [`NullStorage`] that fails every operation.

mod collection;
mod config;
mod criteria;
mod error;
pub mod inflect;
mod model;
mod storage;

pub use collection::{Collection, FixedCollection, LazyCollection, Member, Slot};
pub use config::{BackendConfig, StorageConfig};
pub use criteria::Criteria;
pub use error::{ModelError, ModelResult};
pub use model::{DirtyFields, Field, Model, ModelRepository, ModelType, ModelsExt, Record};
#[cfg(feature = "database")]
pub use storage::{DatabaseStorage, Statement};
pub use storage::{
    Changeset, FileStorage, InMemorySession, NullStorage, Row, SessionStorage, SessionStore,
    StorageBackend, StorageManager,
};

#[cfg(feature = "derive")]
pub use active_record_rs_macros::Model;
