//! Validation gate for dirsync.
//!
//! Nothing reaches a canonical file without passing the [`Validator`]. A
//! category's [`CategoryContract`] names the fields every entry must carry
//! and may attach a nested [`SchemaContract`] loaded from
//! `{schemas_dir}/{category}.schema.json`. The validator runs a pipeline of
//! [`DocumentCheck`]s and returns every violation it finds.
//!
//! # Quick Start
//!
//! ```rust
//! use dirsync_types::{CategoryName, DataSet, Entry, Timestamp};
//! use dirsync_validate::{ContractRegistry, Validator};
//!
//! let validator = Validator::with_default_checks(ContractRegistry::new());
//! let now = Timestamp::parse("2024-01-01 00:00:00").unwrap();
//! let dataset = DataSet::with_entries(vec![Entry::new("Cafe Rio", "Coffee shop")], &now);
//! let shops = CategoryName::new("shops").unwrap();
//! assert!(validator.validate(&dataset, &shops).is_ok());
//! ```

pub mod checks;
pub mod contract;
pub mod error;
pub mod validator;

pub use checks::{DocumentCheck, IdentityCheck, RequiredFieldsCheck, SchemaCheck};
pub use contract::{CategoryContract, ContractRegistry, SchemaContract};
pub use error::{ContractError, ValidationError, ValidationResult};
pub use validator::{AuditReport, AuditStatus, Validator};
