//! Foundation types for dirsync.
//!
//! Every other dirsync crate depends on `dirsync-types`. The types here model
//! the on-disk shape of a curated directory file and nothing else: fetching,
//! merging, validating and persisting live in their own crates.
//!
//! # Key Types
//!
//! - [`Entry`] — One directory entry: an ordered field mapping keyed by `Name`
//! - [`DataSet`] — A category's full document (`Entries` + `last_updated`)
//! - [`Timestamp`] — Wall-clock time in the canonical `YYYY-MM-DD HH:MM:SS` form
//! - [`Clock`] — Time source seam so tests can pin `now`
//! - [`CategoryName`] — Validated category identifier, safe to use as a file stem

pub mod category;
pub mod dataset;
pub mod entry;
pub mod error;
pub mod temporal;

pub use category::{validate_category_name, CategoryName};
pub use dataset::DataSet;
pub use entry::{Entry, DESCRIPTION, LAST_UPDATED, NAME};
pub use error::TypeError;
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
