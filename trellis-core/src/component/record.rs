//! Record Implementation
//!
//! A Record is the unit of component data: a mapping from field name to
//! value. Both the externally supplied input record and the instance-owned
//! state record are Records.
//!
//! # Semantics
//!
//! - Field order is preserved across inserts and merges, so output produced
//!   from a record is deterministic.
//!
//! - `merge` is a shallow union: fields from the incoming record overwrite
//!   same-named fields, other fields are untouched. Nested values are
//!   replaced wholesale, never merged recursively.
//!
//! - Equality ignores field order. Two records with the same fields and
//!   values compare equal, which is what the update gate and the derived
//!   state synchronizer need to detect "nothing actually changed".
//!
//! Values are dynamic (`serde_json::Value`), matching the untyped shape of
//! the data flowing between the driver and component code.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// An ordered mapping from field name to dynamic value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field's value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field, overwriting any existing value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style [`set`](Record::set).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Shallow union: fields from `other` overwrite same-named fields here.
    pub fn merge(&mut self, other: &Record) {
        for (field, value) in other.iter() {
            self.fields.insert(field.clone(), value.clone());
        }
    }

    /// Whether the record has a field of this name.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl<S, V> FromIterator<(S, V)> for Record
where
    S: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_is_a_shallow_union() {
        let mut record = Record::from_iter([("a", 1), ("b", 2)]);
        let patch = Record::from_iter([("b", 20), ("c", 30)]);

        record.merge(&patch);

        assert_eq!(record.get("a"), Some(&json!(1)));
        assert_eq!(record.get("b"), Some(&json!(20)));
        assert_eq!(record.get("c"), Some(&json!(30)));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn merge_replaces_nested_values_wholesale() {
        let mut record = Record::new().with("user", json!({"name": "Elon", "org": "SpaceX"}));
        let patch = Record::new().with("user", json!({"name": "Gwynne"}));

        record.merge(&patch);

        // No recursive merge: the nested object is replaced entirely.
        assert_eq!(record.get("user"), Some(&json!({"name": "Gwynne"})));
    }

    #[test]
    fn equality_ignores_field_order() {
        let a = Record::from_iter([("x", 1), ("y", 2)]);
        let b = Record::from_iter([("y", 2), ("x", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn sequential_merges_left_fold() {
        let mut record = Record::new();
        for patch in [
            Record::from_iter([("n", 1)]),
            Record::from_iter([("n", 2), ("m", 10)]),
            Record::from_iter([("n", 3)]),
        ] {
            record.merge(&patch);
        }
        assert_eq!(record, Record::from_iter([("n", 3), ("m", 10)]));
    }
}
