use html_escape::decode_html_entities;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::app::{BulkfeedError, Result};
use crate::domain::Item;

/// Counts describing one decoded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    /// Records in the payload, including skipped ones.
    pub received: usize,
    /// Records dropped because they carried no usable id.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Decode a posts payload into items. `domain` is the bare host the page
    /// was requested from; relative media URLs are resolved against it.
    pub fn normalize(&self, domain: &str, body: &[u8]) -> Result<(PageMeta, Vec<Item>)> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| BulkfeedError::Format(format!("invalid JSON: {}", e)))?;

        let records = payload.as_array().ok_or_else(|| {
            BulkfeedError::Format(format!("expected a list of posts, got {}", kind_of(&payload)))
        })?;

        let base = Url::parse(&format!("https://{}/", domain))?;

        let mut items = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for record in records {
            let Some(id) = record.get("id").and_then(Value::as_u64) else {
                warn!("Skipping post without a numeric id from {}", domain);
                skipped += 1;
                continue;
            };

            let title = record
                .pointer("/title/rendered")
                .and_then(Value::as_str)
                .map(|t| decode_html_entities(t.trim()).to_string())
                .unwrap_or_default();

            let permalink = record
                .get("link")
                .and_then(Value::as_str)
                .unwrap_or_default();

            let mut item = Item::new(id, title, permalink);
            item.image_url = resolve_image_url(record, &base);
            items.push(item);
        }

        let meta = PageMeta {
            received: records.len(),
            skipped,
        };

        Ok((meta, items))
    }
}

const MEDIA_URL_FIELDS: [&str; 3] = [
    "/source_url",
    "/guid/rendered",
    "/media_details/sizes/full/source_url",
];

/// Pick the featured image URL: the first absolute candidate wins, otherwise
/// the first relative one is resolved against `base`.
fn resolve_image_url(record: &Value, base: &Url) -> Option<String> {
    let media = record.pointer("/_embedded/wp:featuredmedia/0")?;

    let candidates: Vec<&str> = MEDIA_URL_FIELDS
        .iter()
        .filter_map(|field| media.pointer(field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect();

    if let Some(absolute) = candidates.iter().find(|url| is_web_url(url)) {
        return Some(absolute.to_string());
    }

    candidates
        .first()
        .and_then(|relative| join_relative(base, relative))
        .map(String::from)
}

fn join_relative(base: &Url, relative: &str) -> Option<Url> {
    let joined = base.join(relative).ok()?;
    if matches!(joined.scheme(), "http" | "https") {
        return Some(joined);
    }
    // Scheme-looking prefix such as `localhost:8080/`; force a path join.
    base.join(&format!("./{}", relative)).ok()
}

/// Only http(s) URLs count as absolute.
fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
