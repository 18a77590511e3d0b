use serde_yaml::Value;

use super::DocumentCheck;
use crate::contract::CategoryContract;

/// Applies the category's JSON Schema, if it has one.
///
/// A schema that was configured but failed to load rejects every document.
pub struct SchemaCheck;

impl DocumentCheck for SchemaCheck {
    fn name(&self) -> &str {
        "schema"
    }

    fn check(
        &self,
        document: &Value,
        _entries: &[Value],
        contract: &CategoryContract,
        violations: &mut Vec<String>,
    ) {
        if let Some(reason) = &contract.schema_error {
            violations.push(format!("schema unavailable: {reason}"));
        } else if let Some(schema) = &contract.schema {
            schema.check(document, violations);
        }
    }
}
