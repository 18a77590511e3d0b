use std::path::PathBuf;

/// Errors from reading or writing category files.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data set could not be rendered as YAML.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A canonical file exists but is not a readable data set.
    #[error("cannot decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Result alias for store operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
