//! SessionStore - key-value slice of a user session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{ModelError, ModelResult};

/// Key-value storage scoped to one session.
///
/// Implementations must report entries in first-insertion order; overwriting a
/// key keeps its original position.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> ModelResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, bytes: Vec<u8>) -> ModelResult<()>;

    /// Remove a key. Returns true if it existed.
    fn remove(&self, key: &str) -> ModelResult<bool>;

    /// All entries whose key starts with `prefix`, in first-insertion order.
    fn entries(&self, prefix: &str) -> ModelResult<Vec<(String, Vec<u8>)>>;
}

/// Internal stored representation of a session entry.
struct StoredEntry {
    bytes: Vec<u8>,
    seq: u64,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<String, StoredEntry>,
    next_seq: u64,
}

/// In-memory session store backed by a HashMap.
///
/// Clone-friendly via Arc: clones share the same session.
#[derive(Clone, Default)]
pub struct InMemorySession {
    slots: Arc<RwLock<Slots>>,
}

impl InMemorySession {
    /// Create a new empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry, as when the session is reset.
    pub fn clear(&self) -> ModelResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| ModelError::LockPoisoned("session clear"))?;
        slots.entries.clear();
        Ok(())
    }

    pub fn len(&self) -> ModelResult<usize> {
        let slots = self
            .slots
            .read()
            .map_err(|_| ModelError::LockPoisoned("session read"))?;
        Ok(slots.entries.len())
    }

    pub fn is_empty(&self) -> ModelResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl SessionStore for InMemorySession {
    fn get(&self, key: &str) -> ModelResult<Option<Vec<u8>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| ModelError::LockPoisoned("session read"))?;
        Ok(slots.entries.get(key).map(|stored| stored.bytes.clone()))
    }

    fn put(&self, key: &str, bytes: Vec<u8>) -> ModelResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| ModelError::LockPoisoned("session write"))?;

        if let Some(stored) = slots.entries.get_mut(key) {
            stored.bytes = bytes;
            return Ok(());
        }

        let seq = slots.next_seq;
        slots.next_seq += 1;
        slots
            .entries
            .insert(key.to_string(), StoredEntry { bytes, seq });
        Ok(())
    }

    fn remove(&self, key: &str) -> ModelResult<bool> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| ModelError::LockPoisoned("session write"))?;
        Ok(slots.entries.remove(key).is_some())
    }

    fn entries(&self, prefix: &str) -> ModelResult<Vec<(String, Vec<u8>)>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| ModelError::LockPoisoned("session read"))?;

        let mut matching: Vec<(&String, &StoredEntry)> = slots
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();
        matching.sort_by_key(|(_, stored)| stored.seq);

        Ok(matching
            .into_iter()
            .map(|(key, stored)| (key.clone(), stored.bytes.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_get() {
        let session = InMemorySession::new();
        session.put("Post:1", b"one".to_vec()).unwrap();
        assert_eq!(session.get("Post:1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(session.get("Post:2").unwrap(), None);
    }

    #[test]
    fn entries_keep_first_insertion_order() {
        let session = InMemorySession::new();
        session.put("Post:c", b"c".to_vec()).unwrap();
        session.put("Post:a", b"a".to_vec()).unwrap();
        session.put("Author:z", b"z".to_vec()).unwrap();
        session.put("Post:b", b"b".to_vec()).unwrap();
        session.put("Post:c", b"c2".to_vec()).unwrap();

        let keys: Vec<String> = session
            .entries("Post:")
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["Post:c", "Post:a", "Post:b"]);
    }

    #[test]
    fn remove_reports_existence() {
        let session = InMemorySession::new();
        session.put("k", Vec::new()).unwrap();
        assert!(session.remove("k").unwrap());
        assert!(!session.remove("k").unwrap());
    }

    #[test]
    fn clones_share_the_session() {
        let session = InMemorySession::new();
        let clone = session.clone();
        session.put("k", b"v".to_vec()).unwrap();
        assert_eq!(clone.len().unwrap(), 1);

        clone.clear().unwrap();
        assert!(session.is_empty().unwrap());
    }
}
