use serde_json::{Map, Value};

/// Names of the fields written since the last persist.
///
/// Writes are appended as they happen; duplicates are removed when the list is
/// resolved against a snapshot, not on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyFields {
    fields: Vec<String>,
}

impl DirtyFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, field: impl Into<String>) {
        self.fields.push(field.into());
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct tracked fields present in `snapshot`, in first-write order.
    pub fn resolve<'a>(&'a self, snapshot: &Map<String, Value>) -> Vec<&'a str> {
        let mut resolved: Vec<&str> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if snapshot.contains_key(field) && !resolved.contains(&field.as_str()) {
                resolved.push(field);
            }
        }
        resolved
    }
}
