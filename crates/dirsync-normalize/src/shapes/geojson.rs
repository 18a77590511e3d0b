use dirsync_fetch::PayloadShape;
use serde_json::Value;

use crate::normalizer::{
    make_entry, resolve_description, resolve_name, NormalizeContext, Normalized, ShapeNormalizer,
};

const NAME_KEYS: &[&str] = &["NAME", "name"];
const DESCRIPTION_KEYS: &[&str] = &["DESCRIPTION", "description"];

/// GIS layers: entries come from `features[].properties`.
///
/// Geographic entries always carry a description; a missing one becomes
/// `"Location in {category}"`.
pub struct GeoJsonNormalizer;

impl ShapeNormalizer for GeoJsonNormalizer {
    fn shape(&self) -> PayloadShape {
        PayloadShape::Geojson
    }

    fn normalize(&self, body: &Value, ctx: &NormalizeContext<'_>) -> Normalized {
        let mut out = Normalized::default();
        let Some(features) = body.get("features").and_then(Value::as_array) else {
            return out;
        };

        for feature in features {
            let entry = feature
                .get("properties")
                .and_then(Value::as_object)
                .and_then(|props| {
                    let name = resolve_name(props, NAME_KEYS)?;
                    let description = resolve_description(props, DESCRIPTION_KEYS)
                        .unwrap_or_else(|| format!("Location in {}", ctx.category));
                    Some(make_entry(name, description, ctx.now))
                });
            out.push_record(entry);
        }
        out
    }
}
