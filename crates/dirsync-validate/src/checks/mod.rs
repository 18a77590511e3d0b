//! Built-in document checks.

pub mod identity;
pub mod required;
pub mod schema;

pub use identity::IdentityCheck;
pub use required::RequiredFieldsCheck;
pub use schema::SchemaCheck;

use serde_yaml::Value;

use crate::contract::CategoryContract;

/// One rule applied to a document whose `Entries` section is a list.
///
/// Checks never short-circuit one another: each appends its own violations
/// and the validator reports them all together.
pub trait DocumentCheck: Send + Sync {
    /// Short name used in debug logs.
    fn name(&self) -> &str;

    fn check(
        &self,
        document: &Value,
        entries: &[Value],
        contract: &CategoryContract,
        violations: &mut Vec<String>,
    );
}
