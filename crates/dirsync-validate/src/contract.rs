use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dirsync_types::{CategoryName, DESCRIPTION, NAME};
use jsonschema::JSONSchema;
use serde_yaml::Value;

use crate::error::ContractError;

// ---------------------------------------------------------------------------
// CategoryContract
// ---------------------------------------------------------------------------

/// What a category's persisted document must satisfy.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryContract {
    /// Fields every entry must carry. Always starts with `Name`.
    pub required: Vec<String>,
    /// Optional nested contract for the whole document.
    pub schema: Option<SchemaContract>,
    /// Set when a schema was configured but could not be loaded. Every
    /// document of the category then fails validation.
    pub schema_error: Option<String>,
}

impl CategoryContract {
    /// A contract requiring `fields` on every entry.
    ///
    /// `Name` is the upsert identity, so it is always required even when
    /// `fields` leaves it out. Duplicates are dropped, first position wins.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required = vec![NAME.to_string()];
        for field in fields {
            let field = field.into();
            if !required.contains(&field) {
                required.push(field);
            }
        }
        Self {
            required,
            schema: None,
            schema_error: None,
        }
    }

    pub fn with_schema(mut self, schema: SchemaContract) -> Self {
        self.schema = Some(schema);
        self.schema_error = None;
        self
    }

    /// Mark the configured schema as unavailable.
    pub fn with_schema_error(mut self, reason: impl Into<String>) -> Self {
        self.schema = None;
        self.schema_error = Some(reason.into());
        self
    }
}

impl Default for CategoryContract {
    fn default() -> Self {
        Self::new([NAME, DESCRIPTION])
    }
}

// ---------------------------------------------------------------------------
// SchemaContract
// ---------------------------------------------------------------------------

/// A JSON Schema for a whole category document, compiled once at startup.
#[derive(Clone)]
pub struct SchemaContract {
    source: serde_json::Value,
    compiled: Arc<JSONSchema>,
}

impl SchemaContract {
    /// `{schemas_dir}/{category}.schema.json`
    pub fn path_for(schemas_dir: &Path, category: &CategoryName) -> PathBuf {
        schemas_dir.join(format!("{category}.schema.json"))
    }

    pub fn compile(source: serde_json::Value) -> Result<Self, String> {
        let compiled = JSONSchema::compile(&source).map_err(|e| e.to_string())?;
        Ok(Self {
            source,
            compiled: Arc::new(compiled),
        })
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let source = serde_json::from_str(text).map_err(|e| e.to_string())?;
        Self::compile(source)
    }

    pub fn load(path: &Path) -> Result<Self, ContractError> {
        let text = std::fs::read_to_string(path).map_err(|source| ContractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|message| ContractError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// The schema document as written.
    pub fn source(&self) -> &serde_json::Value {
        &self.source
    }

    /// Append a message for every breach, prefixed with the dotted path of
    /// the offending node.
    pub fn check(&self, document: &Value, violations: &mut Vec<String>) {
        let instance = match serde_json::to_value(document) {
            Ok(instance) => instance,
            Err(e) => {
                violations.push(format!("document cannot be checked against its schema: {e}"));
                return;
            }
        };
        if let Err(errors) = self.compiled.validate(&instance) {
            for error in errors {
                let path = dotted_path(&error.instance_path.to_string());
                if path.is_empty() {
                    violations.push(error.to_string());
                } else {
                    violations.push(format!("{path}: {error}"));
                }
            }
        };
    }
}

impl fmt::Debug for SchemaContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaContract")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SchemaContract {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// `/farmers_markets/1/Name` -> `farmers_markets[1].Name`
fn dotted_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        if segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push_str(&format!("[{segment}]"));
        } else {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&segment.replace("~1", "/").replace("~0", "~"));
        }
    }
    path
}

// ---------------------------------------------------------------------------
// ContractRegistry
// ---------------------------------------------------------------------------

/// Contracts by category. Unknown categories get the default contract.
#[derive(Clone, Debug, Default)]
pub struct ContractRegistry {
    contracts: BTreeMap<CategoryName, CategoryContract>,
    fallback: CategoryContract,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: CategoryName, contract: CategoryContract) {
        self.contracts.insert(category, contract);
    }

    pub fn with(mut self, category: CategoryName, contract: CategoryContract) -> Self {
        self.insert(category, contract);
        self
    }

    pub fn get(&self, category: &CategoryName) -> &CategoryContract {
        self.contracts.get(category).unwrap_or(&self.fallback)
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryName> {
        self.contracts.keys()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}
