use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use dirsync_types::{CategoryName, DataSet, Timestamp};

use crate::error::{PersistenceError, PersistenceResult};
use crate::traits::DataStore;

#[derive(Default)]
struct Inner {
    canonical: BTreeMap<CategoryName, DataSet>,
    failure_backups: Vec<(CategoryName, DataSet)>,
    snapshots: Vec<BTreeMap<CategoryName, DataSet>>,
    commits: usize,
    failing_commits: BTreeSet<CategoryName>,
    failing_loads: BTreeSet<CategoryName>,
    fail_snapshot: bool,
}

/// In-memory data store.
///
/// Intended for tests. Counts commits, keeps every backup it is handed, and
/// can be told to fail specific operations.
pub struct InMemoryDataStore {
    inner: RwLock<Inner>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Seed a category's canonical data set without counting a commit.
    pub fn with_dataset(self, category: CategoryName, dataset: DataSet) -> Self {
        self.inner
            .write()
            .expect("lock poisoned")
            .canonical
            .insert(category, dataset);
        self
    }

    /// Make every `commit` for `category` fail with an I/O error.
    pub fn fail_commits_for(&self, category: CategoryName) {
        self.inner
            .write()
            .expect("lock poisoned")
            .failing_commits
            .insert(category);
    }

    /// Make every `load` for `category` fail with a decode error.
    pub fn fail_loads_for(&self, category: CategoryName) {
        self.inner
            .write()
            .expect("lock poisoned")
            .failing_loads
            .insert(category);
    }

    /// Make `snapshot_all` fail.
    pub fn fail_snapshots(&self) {
        self.inner.write().expect("lock poisoned").fail_snapshot = true;
    }

    /// Successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").commits
    }

    pub fn get(&self, category: &CategoryName) -> Option<DataSet> {
        self.inner
            .read()
            .expect("lock poisoned")
            .canonical
            .get(category)
            .cloned()
    }

    pub fn failure_backups(&self) -> Vec<(CategoryName, DataSet)> {
        self.inner.read().expect("lock poisoned").failure_backups.clone()
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").snapshots.len()
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for InMemoryDataStore {
    fn load(&self, category: &CategoryName) -> PersistenceResult<Option<DataSet>> {
        let inner = self.inner.read().expect("lock poisoned");
        if inner.failing_loads.contains(category) {
            return Err(PersistenceError::Decode {
                path: PathBuf::from(format!("memory://{category}.yml")),
                message: "injected load failure".into(),
            });
        }
        Ok(inner.canonical.get(category).cloned())
    }

    fn commit(&self, category: &CategoryName, dataset: &DataSet) -> PersistenceResult<()> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.failing_commits.contains(category) {
            return Err(io::Error::other(format!("injected commit failure for {category}")).into());
        }
        inner.canonical.insert(category.clone(), dataset.clone());
        inner.commits += 1;
        Ok(())
    }

    fn write_failure_backup(
        &self,
        category: &CategoryName,
        dataset: &DataSet,
        now: &Timestamp,
    ) -> PersistenceResult<PathBuf> {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.failure_backups.push((category.clone(), dataset.clone()));
        Ok(PathBuf::from(format!(
            "memory://{category}_backup_{}.yml",
            now.unix_seconds()
        )))
    }

    fn snapshot_all(&self, now: &Timestamp) -> PersistenceResult<PathBuf> {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.fail_snapshot {
            return Err(io::Error::other("injected snapshot failure").into());
        }
        let copy = inner.canonical.clone();
        inner.snapshots.push(copy);
        Ok(PathBuf::from(format!(
            "memory://{}",
            now.format_with(crate::fs::SNAPSHOT_DIR_FORMAT)
        )))
    }
}
