use dirsync_fetch::PayloadShape;
use serde_json::Value;

use crate::normalizer::{NormalizeContext, Normalized, ShapeNormalizer};
use crate::shapes::json::JsonNormalizer;

/// Scraped pages: the scraper has already reduced each page to
/// `{Name, Description}` pairs, so this applies the same record rule as
/// [`JsonNormalizer`].
pub struct HtmlNormalizer;

impl ShapeNormalizer for HtmlNormalizer {
    fn shape(&self) -> PayloadShape {
        PayloadShape::Html
    }

    fn normalize(&self, body: &Value, ctx: &NormalizeContext<'_>) -> Normalized {
        JsonNormalizer::records(body, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsync_types::{CategoryName, Timestamp};
    use serde_json::json;

    #[test]
    fn scraped_pairs_pass_through() {
        let category = CategoryName::new("events").unwrap();
        let now = Timestamp::parse("2024-04-01 09:00:00").unwrap();
        let body = json!([
            {"Name": "Blue Plum Festival", "Description": "Downtown music festival"},
            {"Name": "Farmers Market"}
        ]);
        let out = HtmlNormalizer.normalize(&body, &NormalizeContext { category: &category, now: &now });

        assert_eq!(out.entries.len(), 2);
        assert_eq!(out.entries[0].description(), Some("Downtown music festival"));
        assert_eq!(out.entries[1].description(), Some(""));
    }
}
