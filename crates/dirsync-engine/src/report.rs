use std::collections::BTreeMap;
use std::path::PathBuf;

use dirsync_types::CategoryName;

use crate::error::CycleError;

/// How one category's cycle ended.
#[derive(Debug)]
pub enum CategoryOutcome {
    /// A new canonical file was committed.
    Updated {
        added: usize,
        updated: usize,
        /// New entry count minus old entry count.
        delta: i64,
        entries: usize,
    },
    /// The merged data set matched the stored one; nothing was written.
    Unchanged { entries: usize },
    /// The fetch failed and the category's policy is to skip it.
    Skipped { reason: String },
    /// A stage after fetching failed. The canonical file was not touched.
    Failed {
        error: CycleError,
        /// Where the failure-recovery copy went, if one was written.
        backup: Option<PathBuf>,
    },
}

impl CategoryOutcome {
    pub fn delta(&self) -> i64 {
        match self {
            Self::Updated { delta, .. } => *delta,
            _ => 0,
        }
    }

    /// Entries added or changed by this cycle.
    pub fn changed_entries(&self) -> usize {
        match self {
            Self::Updated { added, updated, .. } => added + updated,
            _ => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: CategoryName,
    pub outcome: CategoryOutcome,
}

/// The result of a full run, in category order.
#[derive(Debug)]
pub struct SyncReport {
    /// The pre-cycle snapshot taken before any category was touched.
    pub snapshot: PathBuf,
    pub categories: Vec<CategoryReport>,
}

impl SyncReport {
    /// Entry-count delta for every category in the run.
    pub fn changes(&self) -> BTreeMap<CategoryName, i64> {
        self.categories
            .iter()
            .map(|r| (r.category.clone(), r.outcome.delta()))
            .collect()
    }

    /// `true` if any canonical file was rewritten.
    pub fn has_changes(&self) -> bool {
        self.categories
            .iter()
            .any(|r| matches!(r.outcome, CategoryOutcome::Updated { .. }))
    }

    pub fn failures(&self) -> impl Iterator<Item = &CategoryReport> {
        self.categories.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn outcome(&self, category: &CategoryName) -> Option<&CategoryOutcome> {
        self.categories
            .iter()
            .find(|r| &r.category == category)
            .map(|r| &r.outcome)
    }

    /// One line per rewritten category, suitable for a commit message.
    pub fn summary_lines(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|r| matches!(r.outcome, CategoryOutcome::Updated { .. }))
            .map(|r| {
                format!(
                    "Updated {} entries in {}",
                    r.outcome.changed_entries(),
                    r.category
                )
            })
            .collect()
    }
}
