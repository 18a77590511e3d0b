//! Built-in normalization strategies, one per payload shape.

pub mod geojson;
pub mod html;
pub mod json;

pub use geojson::GeoJsonNormalizer;
pub use html::HtmlNormalizer;
pub use json::JsonNormalizer;
