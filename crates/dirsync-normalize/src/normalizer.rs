use dirsync_fetch::{PayloadShape, RawPayload};
use dirsync_types::{CategoryName, Entry, Timestamp};
use serde_json::{Map, Value};
use tracing::debug;

use crate::shapes::{GeoJsonNormalizer, HtmlNormalizer, JsonNormalizer};

/// Inputs every strategy may need besides the payload body.
#[derive(Clone, Debug)]
pub struct NormalizeContext<'a> {
    pub category: &'a CategoryName,
    /// Fetch time; stamped on every produced entry as `last_updated`.
    pub now: &'a Timestamp,
}

/// Output of a normalization pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    /// Entries in payload order.
    pub entries: Vec<Entry>,
    /// Records that were skipped because no name could be resolved.
    pub dropped: usize,
}

impl Normalized {
    pub(crate) fn push_record(&mut self, entry: Option<Entry>) {
        match entry {
            Some(entry) => self.entries.push(entry),
            None => self.dropped += 1,
        }
    }
}

/// Normalization strategy for one payload shape.
pub trait ShapeNormalizer: Send + Sync {
    /// The shape this strategy handles.
    fn shape(&self) -> PayloadShape;

    /// Extract canonical entries from a payload body.
    fn normalize(&self, body: &Value, ctx: &NormalizeContext<'_>) -> Normalized;
}

/// The strategy responsible for `shape`.
pub fn strategy_for(shape: PayloadShape) -> &'static dyn ShapeNormalizer {
    match shape {
        PayloadShape::Json => &JsonNormalizer,
        PayloadShape::Geojson => &GeoJsonNormalizer,
        PayloadShape::Html => &HtmlNormalizer,
    }
}

/// Normalize a raw payload for `category`, stamping entries with `now`.
pub fn normalize(payload: &RawPayload, category: &CategoryName, now: &Timestamp) -> Normalized {
    let ctx = NormalizeContext { category, now };
    let out = strategy_for(payload.shape).normalize(&payload.body, &ctx);
    debug!(
        category = %category,
        shape = %payload.shape,
        entries = out.entries.len(),
        dropped = out.dropped,
        "normalized payload"
    );
    out
}

/// Value of the first key in `keys` that is present and not null.
pub(crate) fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))
}

/// A record's name: the first present name key, which must hold a
/// non-blank string.
pub(crate) fn resolve_name(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first_present(record, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// A record's description: the first present description key. Scalars are
/// rendered as text; anything else counts as absent.
pub(crate) fn resolve_description(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    match first_present(record, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Build a stamped entry from resolved parts.
pub(crate) fn make_entry(name: String, description: String, now: &Timestamp) -> Entry {
    let mut entry = Entry::new(name, description);
    entry.touch(now);
    entry
}
