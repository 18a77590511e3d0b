//! Fetching raw records for dirsync.
//!
//! A [`SourceAdapter`] knows how to pull one category's payload from
//! somewhere (an HTTP API, a directory of scraped fixtures). The
//! [`RetryingFetcher`] wraps any such call with a bounded number of attempts
//! and a fixed delay between them, and reports exactly one [`ApiCall`] per
//! fetch to a [`CallRecorder`].
//!
//! Only [`SourceError`] is ever retried. Everything downstream of a fetch
//! (normalizing, merging, validating, persisting) has its own error type and
//! never reaches the retry loop.

pub mod error;
pub mod file;
pub mod http;
pub mod payload;
pub mod retry;
pub mod source;

pub use error::{FetchError, FetchResult, SourceError};
pub use file::FileSource;
pub use http::HttpSource;
pub use payload::{PayloadShape, RawPayload};
pub use retry::{ApiCall, CallRecorder, NullRecorder, RetryPolicy, RetryingFetcher};
pub use source::{SourceAdapter, SourceRequest};
