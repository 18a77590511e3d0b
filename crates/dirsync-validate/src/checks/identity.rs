use std::collections::HashMap;

use dirsync_types::NAME;
use serde_yaml::Value;

use super::DocumentCheck;
use crate::contract::CategoryContract;

/// `Name` values are non-blank strings and no two entries share one.
///
/// An absent `Name` is the required-fields check's business, not this one's.
pub struct IdentityCheck;

impl DocumentCheck for IdentityCheck {
    fn name(&self) -> &str {
        "identity"
    }

    fn check(
        &self,
        _document: &Value,
        entries: &[Value],
        _contract: &CategoryContract,
        violations: &mut Vec<String>,
    ) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let Some(name) = entry.as_mapping().and_then(|m| m.get(NAME)) else {
                continue;
            };
            match name.as_str() {
                Some(s) if !s.trim().is_empty() => {
                    let first = *seen.entry(s).or_insert(i);
                    if first != i {
                        violations.push(format!(
                            "entry {i} duplicates Name '{s}' of entry {first}"
                        ));
                    }
                }
                _ => violations.push(format!("entry {i} has an empty or non-string 'Name'")),
            }
        }
    }
}
