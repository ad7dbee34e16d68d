//! Raw header-block parsing and structured sub-parsers.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::{HeaderValue, Headers, LinkEntry};

static HEADER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([\w-]+):[ \t]*(.*?)\r?$").expect("header line pattern"));

static LINK_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(\S+?)>; rel="(\w+)"(?:; title="(.*?)")?"#).expect("link segment pattern")
});

static CONTENT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"bytes\s+(?:\d+-\d+|\*)/(\d+|\*)").expect("content range pattern"));

/// Parse a CRLF/LF-delimited `Name: value` block into canonical headers.
/// Names known to carry structure (currently `Link`) receive a sub-parse;
/// everything else keeps its raw string value.
pub fn parse_header_block(raw: &str) -> Headers {
    let mut headers = Headers::new();
    for capture in HEADER_LINE.captures_iter(raw.trim()) {
        let name = Headers::canonical_name(&capture[1]);
        let value = &capture[2];
        let value = match name.as_str() {
            "Link" => HeaderValue::Link(parse_link_header(value)),
            _ => HeaderValue::Text(value.to_string()),
        };
        headers.insert_value(name, value);
    }
    headers
}

/// Parse a `Link` header into a map keyed by relation name. Segments that
/// don't match the `<URI>; rel="x"` grammar are skipped.
pub fn parse_link_header(value: &str) -> BTreeMap<String, LinkEntry> {
    LINK_SEGMENT
        .captures_iter(value)
        .map(|capture| {
            let rel = capture[2].to_string();
            (
                rel.clone(),
                LinkEntry {
                    uri: capture[1].to_string(),
                    rel,
                    title: capture.get(3).map(|m| m.as_str().to_string()),
                },
            )
        })
        .collect()
}

/// Extract the total size from a `Content-Range` value such as
/// `bytes 0-1023/4096`. An unknown total (`*`) yields `None`.
pub fn content_range_total(value: &str) -> Option<u64> {
    CONTENT_RANGE
        .captures(value)
        .and_then(|capture| capture[1].parse().ok())
}
