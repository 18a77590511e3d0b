use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dirsync_types::{CategoryName, DataSet, Timestamp};
use serde_yaml::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{PersistenceError, PersistenceResult};
use crate::traits::DataStore;

/// Pre-cycle snapshot directory name, relative to the data dir.
pub const SNAPSHOT_DIR_FORMAT: &str = "backup_%Y%m%d_%H%M%S";

/// Canonical files live at `{data_dir}/{category}.yml`.
pub struct FsDataStore {
    data_dir: PathBuf,
}

impl FsDataStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, category: &CategoryName) -> PathBuf {
        self.data_dir.join(format!("{category}.yml"))
    }

    /// `{category}_backup_{unix}.yml`, with a counter appended if a backup
    /// from the same second already exists.
    fn failure_backup_path(&self, category: &CategoryName, now: &Timestamp) -> PathBuf {
        let stem = format!("{category}_backup_{}", now.unix_seconds());
        let mut path = self.data_dir.join(format!("{stem}.yml"));
        let mut n = 1;
        while path.exists() {
            path = self.data_dir.join(format!("{stem}_{n}.yml"));
            n += 1;
        }
        path
    }
}

impl DataStore for FsDataStore {
    fn load(&self, category: &CategoryName) -> PersistenceResult<Option<DataSet>> {
        let path = self.path_for(category);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let decode = |message: String| PersistenceError::Decode {
            path: path.clone(),
            message,
        };
        let value: Value = serde_yaml::from_str(&text).map_err(|e| decode(e.to_string()))?;
        if value.is_null() {
            return Ok(None);
        }
        let dataset: DataSet =
            serde_yaml::from_value(value).map_err(|e| decode(e.to_string()))?;
        debug!(category = %category, entries = dataset.len(), "loaded data set");
        Ok(Some(dataset))
    }

    fn commit(&self, category: &CategoryName, dataset: &DataSet) -> PersistenceResult<()> {
        let yaml = dataset
            .to_yaml()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        fs::create_dir_all(&self.data_dir)?;

        // Stage next to the target so the rename never crosses filesystems.
        let mut staged = NamedTempFile::new_in(&self.data_dir)?;
        staged.write_all(yaml.as_bytes())?;
        let path = self.path_for(category);
        // The staged file is private; the canonical file keeps its own mode.
        if let Some(permissions) = canonical_permissions(&path)? {
            staged.as_file().set_permissions(permissions)?;
        }
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| PersistenceError::Io(e.error))?;

        info!(
            category = %category,
            action = "commit",
            entries = dataset.len(),
            path = %path.display(),
            "wrote canonical file"
        );
        Ok(())
    }

    fn write_failure_backup(
        &self,
        category: &CategoryName,
        dataset: &DataSet,
        now: &Timestamp,
    ) -> PersistenceResult<PathBuf> {
        let yaml = dataset
            .to_yaml()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        fs::create_dir_all(&self.data_dir)?;
        let path = self.failure_backup_path(category, now);
        fs::write(&path, yaml)?;
        info!(
            category = %category,
            action = "failure_backup",
            entries = dataset.len(),
            path = %path.display(),
            "wrote failure-recovery backup"
        );
        Ok(path)
    }

    fn snapshot_all(&self, now: &Timestamp) -> PersistenceResult<PathBuf> {
        fs::create_dir_all(&self.data_dir)?;
        let snapshot = self.data_dir.join(now.format_with(SNAPSHOT_DIR_FORMAT));
        fs::create_dir_all(&snapshot)?;

        let mut copied = 0usize;
        for entry in WalkDir::new(&self.data_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            let is_yml = path.extension().and_then(|ext| ext.to_str()) == Some("yml");
            let is_failure_backup = entry.file_name().to_string_lossy().contains("_backup_");
            if !entry.file_type().is_file() || !is_yml || is_failure_backup {
                continue;
            }
            fs::copy(path, snapshot.join(entry.file_name()))?;
            copied += 1;
        }

        info!(
            action = "snapshot",
            files = copied,
            path = %snapshot.display(),
            "created pre-cycle backup"
        );
        Ok(snapshot)
    }
}

/// Mode for a rewritten canonical file: whatever the current file has, or
/// world-readable for a new one.
fn canonical_permissions(path: &Path) -> io::Result<Option<fs::Permissions>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta.permissions())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(new_file_permissions()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}
