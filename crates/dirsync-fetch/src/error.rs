use std::time::Duration;

use thiserror::Error;

/// A single failed attempt to reach a source. Treated as transient.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal fetch failure, raised once every attempt has failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch from {source_id} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        source_id: String,
        attempts: u32,
        #[source]
        last: SourceError,
    },
}

impl FetchError {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The error from the final attempt.
    pub fn last_cause(&self) -> &SourceError {
        match self {
            Self::Exhausted { last, .. } => last,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
