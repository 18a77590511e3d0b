//! Persistence guard for dirsync.
//!
//! The [`DataStore`] trait owns every write to the data directory. A
//! canonical file is only ever replaced whole, a pre-cycle snapshot is taken
//! before a run touches anything, and a failed category cycle leaves a
//! recovery copy of its last known-good state next to the canonical file.
//!
//! Backends: [`FsDataStore`] for the real data directory and
//! [`InMemoryDataStore`] for tests.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{PersistenceError, PersistenceResult};
pub use fs::{FsDataStore, SNAPSHOT_DIR_FORMAT};
pub use memory::InMemoryDataStore;
pub use traits::DataStore;
