use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SourceError;
use crate::payload::RawPayload;
use crate::source::{SourceAdapter, SourceRequest};

/// Reads payloads from `{dir}/{category}.json`.
///
/// Used for offline runs against captured API responses or scraper output.
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, request: &SourceRequest) -> PathBuf {
        self.dir.join(format!("{}.json", request.category))
    }
}

#[async_trait]
impl SourceAdapter for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<RawPayload, SourceError> {
        let path = self.path_for(request);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SourceError::Io(io::Error::new(
                e.kind(),
                format!("{}: {e}", path.display()),
            ))
        })?;
        let body = serde_json::from_str(&text)
            .map_err(|e| SourceError::Decode(format!("{}: {e}", path.display())))?;
        Ok(RawPayload::new(request.shape, body))
    }
}
