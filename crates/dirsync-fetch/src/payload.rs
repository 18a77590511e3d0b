use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a source lays out its records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadShape {
    /// An array of record objects with `Name`/`name` and
    /// `Description`/`description`.
    Json,
    /// A GeoJSON `FeatureCollection`; records live in
    /// `features[].properties`.
    Geojson,
    /// `{Name, Description}` pairs already extracted by a page scraper.
    Html,
}

impl PayloadShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Geojson => "geojson",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for PayloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "geojson" => Ok(Self::Geojson),
            "html" => Ok(Self::Html),
            other => Err(format!("unknown payload shape: {other}")),
        }
    }
}

/// Whatever a source returned, tagged with its declared shape.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPayload {
    pub shape: PayloadShape,
    pub body: serde_json::Value,
}

impl RawPayload {
    pub fn new(shape: PayloadShape, body: serde_json::Value) -> Self {
        Self { shape, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("GeoJSON".parse::<PayloadShape>().unwrap(), PayloadShape::Geojson);
        assert_eq!("html".parse::<PayloadShape>().unwrap(), PayloadShape::Html);
        assert!("xml".parse::<PayloadShape>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&PayloadShape::Geojson).unwrap();
        assert_eq!(json, "\"geojson\"");
    }
}
