use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::entry::Entry;
use crate::error::TypeError;
use crate::temporal::Timestamp;

/// A category's complete document.
///
/// On disk this is one YAML file:
///
/// ```yaml
/// Entries:
///   - Name: Cafe Rio
///     Description: Coffee shop
///     last_updated: 2024-03-01 08:15:00
/// last_updated: 2024-03-01 08:15:00
/// ```
///
/// Any other top-level section (agriculture's `growing_zone`, say) is kept
/// in `sections` and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    /// Entries sorted by `Name`.
    #[serde(rename = "Entries")]
    pub entries: Vec<Entry>,
    /// When the data set was last written, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default)]
    pub last_updated: String,
    /// Top-level sections other than `Entries` and `last_updated`.
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

impl DataSet {
    /// A data set with no entries, stamped at `now`.
    pub fn empty(now: &Timestamp) -> Self {
        Self {
            entries: Vec::new(),
            last_updated: now.to_string(),
            sections: BTreeMap::new(),
        }
    }

    pub fn with_entries(entries: Vec<Entry>, now: &Timestamp) -> Self {
        Self {
            entries,
            last_updated: now.to_string(),
            sections: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by exact name.
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name() == Some(name))
    }

    /// Entry names in stored order. Unnamed entries are skipped.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().filter_map(Entry::name).collect()
    }

    /// `true` when no two entries share a `Name`.
    pub fn has_unique_names(&self) -> bool {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(Entry::name)
            .all(|name| seen.insert(name))
    }

    /// `true` when entries are in ascending byte order of `Name`.
    pub fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].name().unwrap_or("") <= w[1].name().unwrap_or(""))
    }

    /// Same entries (ignoring per-entry `last_updated`) and same sections.
    pub fn same_content(&self, other: &DataSet) -> bool {
        self.sections == other.sections
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.same_content(b))
    }

    /// Canonical YAML text.
    pub fn to_yaml(&self) -> Result<String, TypeError> {
        serde_yaml::to_string(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn from_yaml(text: &str) -> Result<Self, TypeError> {
        serde_yaml::from_str(text).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// The document as a generic YAML value, for schema walking.
    pub fn to_value(&self) -> Result<Value, TypeError> {
        serde_yaml::to_value(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::parse("2024-03-01 08:15:00").unwrap()
    }

    #[test]
    fn yaml_top_level_keys() {
        let mut entry = Entry::new("Cafe Rio", "Coffee shop");
        entry.touch(&ts());
        let ds = DataSet::with_entries(vec![entry], &ts());
        let yaml = ds.to_yaml().unwrap();
        assert!(yaml.starts_with("Entries:\n"));
        assert!(yaml.contains("- Name: Cafe Rio\n"));
        assert!(yaml.contains("\nlast_updated: "));

        let back = DataSet::from_yaml(&yaml).unwrap();
        assert_eq!(back.last_updated, "2024-03-01 08:15:00");
        assert_eq!(back.entries[0].last_updated(), Some("2024-03-01 08:15:00"));
    }

    #[test]
    fn extra_sections_survive_roundtrip() {
        let text = "\
Entries:
- Name: Tomatoes
  Description: Plant after last frost
last_updated: 2024-01-01 00:00:00
growing_zone:
  zone: 7a
  last_frost: April 15
";
        let ds = DataSet::from_yaml(text).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(ds.sections.contains_key("growing_zone"));

        let back = DataSet::from_yaml(&ds.to_yaml().unwrap()).unwrap();
        assert_eq!(back, ds);
    }

    #[test]
    fn missing_entries_key_is_an_error() {
        let err = DataSet::from_yaml("last_updated: 2024-01-01 00:00:00\n").unwrap_err();
        assert!(matches!(err, TypeError::Serialization(_)));
    }

    #[test]
    fn uniqueness_and_order_checks() {
        let ds = DataSet::with_entries(
            vec![Entry::new("A", ""), Entry::new("B", ""), Entry::new("a", "")],
            &ts(),
        );
        assert!(ds.has_unique_names());
        assert!(ds.is_sorted());

        let dup = DataSet::with_entries(vec![Entry::new("A", ""), Entry::new("A", "")], &ts());
        assert!(!dup.has_unique_names());

        let unsorted = DataSet::with_entries(vec![Entry::new("b", ""), Entry::new("B", "")], &ts());
        assert!(!unsorted.is_sorted());
    }

    #[test]
    fn find_is_case_sensitive() {
        let ds = DataSet::with_entries(vec![Entry::new("Park", "x")], &ts());
        assert!(ds.find("Park").is_some());
        assert!(ds.find("park").is_none());
    }
}
