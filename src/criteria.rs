//! Criteria - flat field = value filters, ANDed.
//!
//! The file and session backends evaluate criteria in memory with
//! [`Criteria::matches`]; the database backend renders the same filters into a
//! `where` clause that also compares `typeof` on both sides. Both paths use
//! strict equality: `1`, `1.0` and `"1"` are three different values.
//!
//! Every backend stores each stored field of a record, with unset fields as
//! `null`, so a `null` filter matches unset fields everywhere.

use serde_json::{Map, Value};

/// An ordered set of `field = value` filters. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    filters: Map<String, Value>,
}

impl Criteria {
    /// Criteria that match every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field = value` filter. A repeated field replaces the earlier value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Filters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True iff every filtered field is present in `row` and strictly equal.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| row.get(field) == Some(expected))
    }
}

impl From<Map<String, Value>> for Criteria {
    fn from(filters: Map<String, Value>) -> Self {
        Self { filters }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            filters: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
