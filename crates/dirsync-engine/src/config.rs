use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirsync_fetch::{PayloadShape, RetryPolicy};
use dirsync_types::{CategoryName, DESCRIPTION, NAME};
use dirsync_validate::{CategoryContract, ContractRegistry, SchemaContract};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Everything a run needs to know, read from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory holding the canonical `{category}.yml` files.
    pub data_dir: PathBuf,
    /// Directory holding `{category}.schema.json` contracts.
    pub schemas_dir: PathBuf,
    /// Where run metrics are written as JSON.
    pub metrics_file: PathBuf,
    pub api: ApiConfig,
    pub categories: Vec<CategoryConfig>,
}

/// Built-in categories: name, payload shape, schema flag.
const DEFAULT_CATEGORIES: &[(&str, PayloadShape, bool)] = &[
    ("restaurants", PayloadShape::Json, false),
    ("shops", PayloadShape::Json, false),
    ("events", PayloadShape::Json, false),
    ("parks", PayloadShape::Geojson, false),
    ("agriculture", PayloadShape::Json, true),
];

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            schemas_dir: PathBuf::from("schemas"),
            metrics_file: PathBuf::from("metrics/daily_stats.json"),
            api: ApiConfig::default(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .filter_map(|(name, shape, schema)| {
                    let name = CategoryName::new(*name).ok()?;
                    Some(CategoryConfig {
                        schema: *schema,
                        ..CategoryConfig::new(name, *shape)
                    })
                })
                .collect(),
        }
    }
}

impl SyncConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(EngineError::Config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> EngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.categories.is_empty() {
            return Err(EngineError::Config("no categories configured".into()));
        }
        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(&category.name) {
                return Err(EngineError::Config(format!(
                    "category '{}' is configured twice",
                    category.name
                )));
            }
        }
        if self.api.max_retries == 0 {
            return Err(EngineError::Config("api.max_retries must be at least 1".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.api.max_retries,
            Duration::from_secs(self.api.retry_delay_secs),
        )
    }

    pub fn category(&self, name: &CategoryName) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| &c.name == name)
    }

    pub fn category_names(&self) -> Vec<CategoryName> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// The configured categories named in `only`, in config order. An empty
    /// `only` selects every category.
    pub fn select(&self, only: &[CategoryName]) -> EngineResult<Vec<&CategoryConfig>> {
        if let Some(unknown) = only.iter().find(|n| self.category(n).is_none()) {
            return Err(EngineError::Config(format!("unknown category '{unknown}'")));
        }
        Ok(self
            .categories
            .iter()
            .filter(|c| only.is_empty() || only.contains(&c.name))
            .collect())
    }

    /// Build every category's contract, loading schema files where flagged.
    pub fn contracts(&self) -> ContractRegistry {
        let mut registry = ContractRegistry::new();
        for category in &self.categories {
            let mut contract = CategoryContract::new(category.required.iter().cloned());
            if category.schema {
                let path = SchemaContract::path_for(&self.schemas_dir, &category.name);
                contract = match SchemaContract::load(&path) {
                    Ok(schema) => {
                        debug!(category = %category.name, path = %path.display(), "loaded schema contract");
                        contract.with_schema(schema)
                    }
                    Err(e) => {
                        warn!(category = %category.name, error = %e, "schema unavailable, category will not be committed");
                        contract.with_schema_error(e.to_string())
                    }
                };
            }
            registry.insert(category.name.clone(), contract);
        }
        registry
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
    /// Total attempts per fetch.
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    /// Environment variable holding a bearer token, if the API needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".into(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 5,
            token_env: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// CategoryConfig
// ---------------------------------------------------------------------------

/// What to do with a category whose fetch failed after every retry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Carry on with no incoming entries; existing entries are kept and a
    /// missing file is initialized empty.
    #[default]
    Empty,
    /// Leave the category alone for this run.
    Skip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: CategoryName,
    /// Path appended to `api.base_url`.
    pub endpoint: String,
    #[serde(default = "default_shape")]
    pub shape: PayloadShape,
    /// Fields every entry must carry. `Name` is always added.
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    #[serde(default)]
    pub on_fetch_failure: FetchFailurePolicy,
    /// Load `{schemas_dir}/{name}.schema.json` as a nested contract.
    #[serde(default)]
    pub schema: bool,
}

impl CategoryConfig {
    /// A category at endpoint `/{name}` with the default contract.
    pub fn new(name: CategoryName, shape: PayloadShape) -> Self {
        Self {
            endpoint: format!("/{name}"),
            name,
            shape,
            required: default_required(),
            on_fetch_failure: FetchFailurePolicy::default(),
            schema: false,
        }
    }
}

fn default_shape() -> PayloadShape {
    PayloadShape::Json
}

fn default_required() -> Vec<String> {
    vec![NAME.to_string(), DESCRIPTION.to_string()]
}
