use std::path::PathBuf;

use dirsync_store::PersistenceError;
use dirsync_validate::ValidationError;
use thiserror::Error;

/// Why one category's cycle failed. One variant per failing stage.
///
/// Fetch failures are not here: they are handled by the category's
/// fetch-failure policy before the cycle starts.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to load data set: {0}")]
    Load(#[source] PersistenceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to persist data set: {0}")]
    Persistence(#[source] PersistenceError),
}

impl CycleError {
    /// The stage that failed, as used in log `action` fields.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Validation(_) => "validate",
            Self::Persistence(_) => "commit",
        }
    }
}

/// Errors that stop a run, or stop it from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pre-cycle backup failed, run aborted: {0}")]
    PreCycleBackup(#[source] PersistenceError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write metrics to {path}: {source}")]
    Metrics {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
