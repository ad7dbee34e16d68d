//! Incoming body parsing.
//!
//! Priority for ambiguous content types is fixed: json, then markup, then
//! text, then binary. Parse failures degrade to raw text rather than
//! raising, so a usable response is never masked by a secondary parsing
//! bug.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::{Document, ResponseBody};

static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").expect("iso datetime pattern")
});

/// Parse a raw response body according to its content type.
pub fn parse_body(raw: Bytes, content_type: &str) -> ResponseBody {
    if content_type.contains("json") {
        let text = into_text(raw);
        return match parse_json(&text) {
            Some(value) => ResponseBody::Json(value),
            None => ResponseBody::Text(text),
        };
    }
    if content_type.contains("html") || content_type.contains("xml") {
        let text = into_text(raw);
        return if looks_like_markup(&text) {
            ResponseBody::Document(Document::with_type(content_type, text))
        } else {
            ResponseBody::Text(text)
        };
    }
    if content_type.contains("text") {
        return ResponseBody::Text(into_text(raw));
    }
    ResponseBody::Binary(raw)
}

/// Parse JSON text, promoting canonical ISO-8601 date strings. `None` on
/// malformed input (callers fall back to the raw text).
pub fn parse_json(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(text).ok().map(promote_iso_dates)
}

/// Whether a string is in the canonical ISO-8601 millisecond UTC format
/// (e.g. `2024-01-15T09:30:00.000Z`).
pub fn is_iso_datetime(text: &str) -> bool {
    ISO_DATETIME.is_match(text)
}

/// The typed date value behind a promoted JSON string, when it is one.
pub fn as_datetime(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    if !is_iso_datetime(text) {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Recursively rewrite string values in the canonical ISO-8601 millisecond
/// UTC format to their chrono-validated RFC 3339 rendition. Strings that
/// match the shape but are not real instants are left untouched.
pub fn promote_iso_dates(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(text) => match revive(&text) {
            Some(revived) => serde_json::Value::String(revived),
            None => serde_json::Value::String(text),
        },
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(promote_iso_dates).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, promote_iso_dates(value)))
                .collect(),
        ),
        other => other,
    }
}

fn revive(text: &str) -> Option<String> {
    if !is_iso_datetime(text) {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(text).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string(),
    )
}

fn looks_like_markup(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

fn into_text(raw: Bytes) -> String {
    String::from_utf8_lossy(&raw).into_owned()
}
