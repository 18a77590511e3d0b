//! Turning raw payloads into canonical entries.
//!
//! Every [`PayloadShape`](dirsync_fetch::PayloadShape) has exactly one
//! [`ShapeNormalizer`] strategy. [`normalize`] picks the strategy for the
//! payload's declared shape and returns the entries that could be named.
//!
//! Normalization never fails. A record without a usable name is not a
//! directory entry and is dropped; the count of dropped records is reported
//! in [`Normalized`] and logged at debug level.

pub mod normalizer;
pub mod shapes;

pub use normalizer::{normalize, strategy_for, NormalizeContext, Normalized, ShapeNormalizer};
pub use shapes::{GeoJsonNormalizer, HtmlNormalizer, JsonNormalizer};
