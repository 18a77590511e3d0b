//! Merge engine for dirsync.
//!
//! Upserts freshly normalized entries into a category's persisted data set.
//! Entries are keyed by `Name`; a matching entry is updated field by field
//! and keeps every field the fetch did not supply. Entries the fetch did not
//! mention are carried over untouched: a source going quiet about an item
//! never deletes it.
//!
//! # Key Types
//!
//! - [`merge`] -- the upsert itself
//! - [`MergeOutcome`] -- merged data set plus what changed
//! - [`EntryChange`] -- one added or updated entry

pub mod merge;

pub use merge::{merge, EntryChange, MergeOutcome};
