use async_trait::async_trait;
use dirsync_types::CategoryName;

use crate::error::SourceError;
use crate::payload::{PayloadShape, RawPayload};

/// What to fetch for one category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRequest {
    pub category: CategoryName,
    /// Source-relative endpoint, e.g. `/restaurants`.
    pub endpoint: String,
    /// Shape the payload is declared to have.
    pub shape: PayloadShape,
}

impl SourceRequest {
    pub fn new(category: CategoryName, endpoint: impl Into<String>, shape: PayloadShape) -> Self {
        Self {
            category,
            endpoint: endpoint.into(),
            shape,
        }
    }
}

/// A place raw records come from.
///
/// One call is one attempt; retrying is the [`crate::RetryingFetcher`]'s job.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs and API call records.
    fn name(&self) -> &str;

    /// Fetch one category's payload.
    async fn fetch(&self, request: &SourceRequest) -> Result<RawPayload, SourceError>;
}
