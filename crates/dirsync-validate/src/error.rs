use std::path::PathBuf;

use dirsync_types::CategoryName;
use thiserror::Error;

/// A candidate document that does not satisfy its category contract.
///
/// Carries every violation found, not just the first.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "{category} failed validation with {} violation(s): {}",
    .violations.len(),
    .violations.join("; ")
)]
pub struct ValidationError {
    pub category: CategoryName,
    pub violations: Vec<String>,
}

impl ValidationError {
    pub fn new(category: CategoryName, violations: Vec<String>) -> Self {
        Self {
            category,
            violations,
        }
    }
}

/// A schema contract file that could not be loaded.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid schema {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
