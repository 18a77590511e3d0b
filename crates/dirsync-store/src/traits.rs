use std::path::PathBuf;

use dirsync_types::{CategoryName, DataSet, Timestamp};

use crate::error::PersistenceResult;

/// Durable home of every category's canonical data set.
///
/// Implementations must uphold:
/// - `commit` is all-or-nothing: a reader sees either the old file or the
///   new one, never a partial write.
/// - Backup artifacts are write-only; nothing here reads them back.
/// - Callers only `commit` data sets that passed validation.
///
/// Local disk never suspends long enough to matter, so the trait is sync.
pub trait DataStore: Send + Sync {
    /// Read a category's canonical data set.
    ///
    /// Returns `Ok(None)` if the file is absent or holds an empty document.
    fn load(&self, category: &CategoryName) -> PersistenceResult<Option<DataSet>>;

    /// Replace a category's canonical data set.
    fn commit(&self, category: &CategoryName, dataset: &DataSet) -> PersistenceResult<()>;

    /// Best-effort copy of `dataset` for recovery after a failed cycle.
    /// Returns where the copy was written.
    fn write_failure_backup(
        &self,
        category: &CategoryName,
        dataset: &DataSet,
        now: &Timestamp,
    ) -> PersistenceResult<PathBuf>;

    /// Snapshot every canonical file before a run touches any of them.
    /// Returns the snapshot's location.
    fn snapshot_all(&self, now: &Timestamp) -> PersistenceResult<PathBuf>;
}
