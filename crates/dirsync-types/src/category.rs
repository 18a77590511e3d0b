//! Category name validation.
//!
//! A category name doubles as the stem of its data file
//! (`data/{category}.yml`), its schema file and its backup files, so it is
//! restricted to a conservative alphabet:
//! - Must be non-empty and at most 64 bytes
//! - ASCII lowercase letters, digits, `_` and `-` only
//! - Must start with a letter

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MAX_LEN: usize = 64;

/// Validate a category name, returning `Ok(())` if it is usable as a file stem.
///
/// # Examples
///
/// ```
/// use dirsync_types::validate_category_name;
///
/// assert!(validate_category_name("restaurants").is_ok());
/// assert!(validate_category_name("farm-stands").is_ok());
/// assert!(validate_category_name("").is_err());
/// assert!(validate_category_name("../etc").is_err());
/// ```
pub fn validate_category_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidCategoryName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_LEN {
        return Err(invalid("longer than 64 bytes"));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(invalid("must start with a lowercase letter"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-'))
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// A validated category identifier (`restaurants`, `parks`, ...).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_category_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CategoryName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryName> for String {
    fn from(value: CategoryName) -> Self {
        value.0
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CategoryName({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["restaurants", "shops", "parks", "agriculture", "farm_stands2"] {
            assert!(validate_category_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["../x", "a/b", "a.b", "a b", "Parks", "1parks", "_x"] {
            assert!(validate_category_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(65);
        assert!(validate_category_name(&name).is_err());
        assert!(validate_category_name(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: CategoryName = serde_json::from_str("\"events\"").unwrap();
        assert_eq!(ok.as_str(), "events");
        assert!(serde_json::from_str::<CategoryName>("\"Bad Name\"").is_err());
    }
}
