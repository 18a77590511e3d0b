use std::path::Path;

use dirsync_types::{CategoryName, DataSet};
use serde_yaml::Value;
use tracing::{debug, warn};

use crate::checks::{DocumentCheck, IdentityCheck, RequiredFieldsCheck, SchemaCheck};
use crate::contract::{CategoryContract, ContractRegistry};
use crate::error::{ValidationError, ValidationResult};

const ENTRIES: &str = "Entries";

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// The gate between a merged data set and the store.
///
/// Structural problems with the document itself (empty, no `Entries`, not a
/// list) are reported alone since nothing below them can be inspected.
/// Otherwise every check runs and all violations are returned together.
/// Validation never mutates the candidate.
pub struct Validator {
    registry: ContractRegistry,
    checks: Vec<Box<dyn DocumentCheck>>,
}

impl Validator {
    /// A validator with no checks beyond document structure.
    pub fn new(registry: ContractRegistry) -> Self {
        Self {
            registry,
            checks: Vec::new(),
        }
    }

    /// Required fields -> identity -> schema.
    pub fn with_default_checks(registry: ContractRegistry) -> Self {
        let mut validator = Self::new(registry);
        validator.add_check(Box::new(RequiredFieldsCheck));
        validator.add_check(Box::new(IdentityCheck));
        validator.add_check(Box::new(SchemaCheck));
        validator
    }

    pub fn add_check(&mut self, check: Box<dyn DocumentCheck>) {
        self.checks.push(check);
    }

    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn contract(&self, category: &CategoryName) -> &CategoryContract {
        self.registry.get(category)
    }

    /// Validate an in-memory data set.
    pub fn validate(&self, dataset: &DataSet, category: &CategoryName) -> ValidationResult<()> {
        let document = dataset.to_value().map_err(|e| {
            ValidationError::new(category.clone(), vec![format!("unserializable data set: {e}")])
        })?;
        self.validate_document(&document, category)
    }

    /// Validate a parsed YAML document, e.g. a file read back from disk.
    pub fn validate_document(
        &self,
        document: &Value,
        category: &CategoryName,
    ) -> ValidationResult<()> {
        let fail = |violations: Vec<String>| Err(ValidationError::new(category.clone(), violations));

        let root = match document {
            Value::Null => return fail(vec!["empty data file".into()]),
            Value::Mapping(m) if m.is_empty() => return fail(vec!["empty data file".into()]),
            Value::Mapping(m) => m,
            _ => return fail(vec!["data file must be a mapping".into()]),
        };
        let entries = match root.get(ENTRIES) {
            None => return fail(vec!["missing 'Entries' section".into()]),
            Some(Value::Sequence(seq)) => seq,
            Some(_) => return fail(vec!["'Entries' must be a list".into()]),
        };

        let contract = self.registry.get(category);
        let mut violations = Vec::new();
        for check in &self.checks {
            let before = violations.len();
            check.check(document, entries, contract, &mut violations);
            debug!(
                category = %category,
                check = check.name(),
                violations = violations.len() - before,
                "validation check complete"
            );
        }

        if violations.is_empty() {
            if entries.is_empty() {
                debug!(category = %category, "data file is currently empty");
            }
            Ok(())
        } else {
            fail(violations)
        }
    }

    /// Audit the canonical file of every category in `categories` under
    /// `data_dir`. Missing files are reported, not treated as invalid.
    pub fn validate_all<'a, I>(&self, data_dir: &Path, categories: I) -> AuditReport
    where
        I: IntoIterator<Item = &'a CategoryName>,
    {
        let mut report = AuditReport::default();
        for category in categories {
            let path = data_dir.join(format!("{category}.yml"));
            let status = match std::fs::read_to_string(&path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuditStatus::Missing,
                Err(e) => AuditStatus::Invalid(ValidationError::new(
                    category.clone(),
                    vec![format!("unreadable data file: {e}")],
                )),
                Ok(text) => match serde_yaml::from_str::<Value>(&text) {
                    Err(e) => AuditStatus::Invalid(ValidationError::new(
                        category.clone(),
                        vec![format!("malformed YAML: {e}")],
                    )),
                    Ok(doc) => match self.validate_document(&doc, category) {
                        Ok(()) => AuditStatus::Valid,
                        Err(e) => AuditStatus::Invalid(e),
                    },
                },
            };
            if let AuditStatus::Invalid(err) = &status {
                warn!(category = %category, action = "audit", error = %err, "data file failed validation");
            }
            report.results.push((category.clone(), status));
        }
        report
    }
}

// ---------------------------------------------------------------------------
// AuditReport
// ---------------------------------------------------------------------------

/// Result of auditing one category file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditStatus {
    Valid,
    Missing,
    Invalid(ValidationError),
}

/// Per-category audit results in the order the categories were given.
#[derive(Clone, Debug, Default)]
pub struct AuditReport {
    pub results: Vec<(CategoryName, AuditStatus)>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationError> {
        self.results.iter().filter_map(|(_, status)| match status {
            AuditStatus::Invalid(e) => Some(e),
            _ => None,
        })
    }
}
