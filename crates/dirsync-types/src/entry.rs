//! A single directory entry.
//!
//! Entries are ordered YAML mappings. Only `Name`, `Description` and
//! `last_updated` have meaning to dirsync; every other field is opaque and
//! belongs to whoever put it there (usually a human editing the file).

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::temporal::Timestamp;

/// Identity field. Unique within a data set, case-sensitive.
pub const NAME: &str = "Name";
/// Free-text description. Required, may be empty.
pub const DESCRIPTION: &str = "Description";
/// Per-entry refresh time, written by the engine.
pub const LAST_UPDATED: &str = "last_updated";

/// One directory entry, stored as an insertion-ordered field mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(Mapping);

impl Entry {
    /// Create an entry with `Name` and `Description`, in that order.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut entry = Self(Mapping::new());
        entry.insert(NAME, Value::String(name.into()));
        entry.insert(DESCRIPTION, Value::String(description.into()));
        entry
    }

    /// Wrap an existing mapping without inspecting it.
    pub fn from_mapping(fields: Mapping) -> Self {
        Self(fields)
    }

    /// The entry's `Name`, if present and a string.
    pub fn name(&self) -> Option<&str> {
        self.get_str(NAME)
    }

    /// The entry's `Description`, if present and a string.
    pub fn description(&self) -> Option<&str> {
        self.get_str(DESCRIPTION)
    }

    /// The entry's `last_updated` value, if present and a string.
    pub fn last_updated(&self) -> Option<&str> {
        self.get_str(LAST_UPDATED)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Set a field. An existing key keeps its position in the mapping.
    pub fn insert(&mut self, field: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(Value::String(field.to_string()), value.into())
    }

    /// Stamp `last_updated`.
    pub fn touch(&mut self, now: &Timestamp) {
        self.insert(LAST_UPDATED, Value::String(now.to_string()));
    }

    /// Shallow field-level overwrite: every field of `other` replaces or
    /// extends the same-named field here. Fields absent from `other` are kept.
    pub fn overlay(&mut self, other: &Entry) {
        for (key, value) in other.0.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// `true` when both entries hold the same fields apart from
    /// `last_updated`.
    pub fn same_content(&self, other: &Entry) -> bool {
        self.without_timestamp() == other.without_timestamp()
    }

    fn without_timestamp(&self) -> Mapping {
        let mut fields = self.0.clone();
        fields.remove(LAST_UPDATED);
        fields
    }

    /// Field names in mapping order. Non-string keys are skipped.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().filter_map(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn into_mapping(self) -> Mapping {
        self.0
    }
}

impl From<Mapping> for Entry {
    fn from(fields: Mapping) -> Self {
        Self(fields)
    }
}
