use std::collections::BTreeMap;

use dirsync_types::{DataSet, Entry, Timestamp, LAST_UPDATED};
use serde_yaml::Value;
use tracing::{debug, warn};

/// A single entry-level change produced by a merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryChange {
    /// The fetch supplied a name the data set did not have.
    Added { name: String },
    /// The fetch changed one or more fields of an existing entry.
    Updated { name: String, fields: Vec<String> },
}

impl EntryChange {
    pub fn name(&self) -> &str {
        match self {
            Self::Added { name } | Self::Updated { name, .. } => name,
        }
    }
}

/// The result of merging one fetch into one data set.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    /// The merged data set, sorted by `Name`.
    pub dataset: DataSet,
    /// Added and updated entries, in name order.
    pub changes: Vec<EntryChange>,
    /// Matched entries whose fields (apart from `last_updated`) did not change.
    pub unchanged: usize,
    /// Existing entries the fetch did not mention.
    pub retained: usize,
    /// Incoming entries without a usable name.
    pub ignored: usize,
    /// Names that occur more than once in the existing data set. Every copy
    /// is kept, so the merged set fails identity validation until the file
    /// is fixed by hand.
    pub duplicates: Vec<String>,
    /// Entry count before the merge.
    pub previous_len: usize,
}

impl MergeOutcome {
    pub fn added(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, EntryChange::Added { .. }))
            .count()
    }

    pub fn updated(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, EntryChange::Updated { .. }))
            .count()
    }

    /// New entry count minus old entry count.
    pub fn delta(&self) -> i64 {
        self.dataset.len() as i64 - self.previous_len as i64
    }

    /// `true` if any entry was added or had a field changed.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Upsert `incoming` into `existing`.
///
/// 1. Existing entries are indexed by `Name`.
/// 2. Incoming entries are indexed by `Name`; a later duplicate in fetch
///    order replaces an earlier one.
/// 3. A name in both gets the existing fields overlaid by the incoming ones.
/// 4. A name only in `incoming` is inserted as-is.
/// 5. A name only in `existing` is carried over unchanged.
/// 6. The result is sorted by `Name` in byte order.
/// 7. The data set's `last_updated` becomes `now`.
///
/// Existing entries with no string `Name` cannot be matched; they are kept
/// ahead of the named entries so curated content is never lost. Later copies
/// of a name already seen in `existing` are kept right after the first one,
/// which is the only copy the fetch is overlaid on.
///
/// For a fixed `now`, merging the same fetch twice yields the same data set.
pub fn merge(existing: &DataSet, incoming: Vec<Entry>, now: &Timestamp) -> MergeOutcome {
    let mut index: BTreeMap<String, Entry> = BTreeMap::new();
    let mut copies: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
    let mut unnamed: Vec<Entry> = Vec::new();
    for entry in &existing.entries {
        match entry.name() {
            Some(name) if index.contains_key(name) => {
                copies.entry(name.to_string()).or_default().push(entry.clone());
            }
            Some(name) => {
                index.insert(name.to_string(), entry.clone());
            }
            None => unnamed.push(entry.clone()),
        }
    }
    let existing_named = index.len();
    let duplicates: Vec<String> = copies.keys().cloned().collect();
    if !duplicates.is_empty() {
        warn!(names = ?duplicates, "existing data set repeats names; keeping every copy");
    }

    let mut ignored = 0;
    let mut fetched: BTreeMap<String, Entry> = BTreeMap::new();
    for entry in incoming {
        match entry.name().map(str::to_string) {
            Some(name) => {
                fetched.insert(name, entry);
            }
            None => ignored += 1,
        }
    }

    let mut changes = Vec::new();
    let mut unchanged = 0;
    let mut matched = 0;
    for (name, entry) in fetched {
        match index.get_mut(&name) {
            Some(current) => {
                matched += 1;
                let before = current.clone();
                current.overlay(&entry);
                let fields = changed_fields(&before, current);
                if fields.is_empty() {
                    unchanged += 1;
                } else {
                    changes.push(EntryChange::Updated { name, fields });
                }
            }
            None => {
                changes.push(EntryChange::Added { name: name.clone() });
                index.insert(name, entry);
            }
        }
    }

    let previous_len = existing.entries.len();
    let mut entries: Vec<Entry> = unnamed;
    for (name, entry) in index {
        entries.push(entry);
        if let Some(extra) = copies.remove(&name) {
            entries.extend(extra);
        }
    }
    let dataset = DataSet {
        entries,
        last_updated: now.to_string(),
        sections: existing.sections.clone(),
    };

    let outcome = MergeOutcome {
        dataset,
        changes,
        unchanged,
        retained: existing_named - matched,
        ignored,
        duplicates,
        previous_len,
    };
    debug!(
        added = outcome.added(),
        updated = outcome.updated(),
        unchanged = outcome.unchanged,
        retained = outcome.retained,
        ignored = outcome.ignored,
        "merged entries"
    );
    outcome
}

/// Fields whose value differs between `before` and `after`, ignoring
/// `last_updated`. An overlay never removes fields, so only `after`'s keys
/// need checking.
fn changed_fields(before: &Entry, after: &Entry) -> Vec<String> {
    after
        .as_mapping()
        .iter()
        .filter_map(|(key, value)| {
            let key = key.as_str()?;
            if key == LAST_UPDATED {
                return None;
            }
            let previous: Option<&Value> = before.get(key);
            (previous != Some(value)).then(|| key.to_string())
        })
        .collect()
}
