//! Pure content negotiation: no I/O, no async.
//!
//! - [`headers`] - raw header-block parsing, Train-Case canonicalization,
//!   and per-name structured sub-parsers (`Link`, `Content-Range`)
//! - [`request`] - outgoing body serialization from a declared or inferred
//!   media type
//! - [`response`] - incoming body parsing by content type, with a fixed
//!   json → markup → text → binary priority

pub mod headers;
pub mod request;
pub mod response;

pub use headers::{content_range_total, parse_header_block, parse_link_header};
pub use request::{Encoded, serialize_body};
pub use response::{as_datetime, is_iso_datetime, parse_body, parse_json, promote_iso_dates};
