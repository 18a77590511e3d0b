use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid category name: {name}: {reason}")]
    InvalidCategoryName { name: String, reason: String },

    #[error("invalid timestamp {value:?}: expected YYYY-MM-DD HH:MM:SS")]
    InvalidTimestamp { value: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
