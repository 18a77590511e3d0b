use dirsync_fetch::PayloadShape;
use dirsync_types::Entry;
use serde_json::{Map, Value};

use crate::normalizer::{
    make_entry, resolve_description, resolve_name, NormalizeContext, Normalized, ShapeNormalizer,
};

const NAME_KEYS: &[&str] = &["Name", "name"];
const DESCRIPTION_KEYS: &[&str] = &["Description", "description"];

/// API listings: an array of record objects.
///
/// A bare object is read as a one-record listing.
pub struct JsonNormalizer;

impl JsonNormalizer {
    /// The record rule shared with scraped (`html`) payloads.
    pub(crate) fn entry_from_record(
        record: &Map<String, Value>,
        ctx: &NormalizeContext<'_>,
    ) -> Option<Entry> {
        let name = resolve_name(record, NAME_KEYS)?;
        let description = resolve_description(record, DESCRIPTION_KEYS).unwrap_or_default();
        Some(make_entry(name, description, ctx.now))
    }

    pub(crate) fn records(body: &Value, ctx: &NormalizeContext<'_>) -> Normalized {
        let mut out = Normalized::default();
        match body {
            Value::Array(items) => {
                for item in items {
                    out.push_record(item.as_object().and_then(|r| Self::entry_from_record(r, ctx)));
                }
            }
            Value::Object(record) => out.push_record(Self::entry_from_record(record, ctx)),
            _ => {}
        }
        out
    }
}

impl ShapeNormalizer for JsonNormalizer {
    fn shape(&self) -> PayloadShape {
        PayloadShape::Json
    }

    fn normalize(&self, body: &Value, ctx: &NormalizeContext<'_>) -> Normalized {
        Self::records(body, ctx)
    }
}
