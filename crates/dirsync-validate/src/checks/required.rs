use serde_yaml::Value;

use super::DocumentCheck;
use crate::contract::CategoryContract;

/// Every entry is a mapping holding every required field.
pub struct RequiredFieldsCheck;

impl DocumentCheck for RequiredFieldsCheck {
    fn name(&self) -> &str {
        "required-fields"
    }

    fn check(
        &self,
        _document: &Value,
        entries: &[Value],
        contract: &CategoryContract,
        violations: &mut Vec<String>,
    ) {
        for (i, entry) in entries.iter().enumerate() {
            let Some(fields) = entry.as_mapping() else {
                violations.push(format!("entry {i} must be a mapping"));
                continue;
            };
            for field in &contract.required {
                if !fields.contains_key(field.as_str()) {
                    violations.push(format!("entry {i} missing required field '{field}'"));
                }
            }
        }
    }
}
