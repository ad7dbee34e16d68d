//! Chunked, resumable downloads over the `lamina` HTTP client.
//!
//! A download is a pull-based stream of progress-annotated byte chunks:
//! a `HEAD` probe learns the resource size, then sequential ranged `GET`s
//! fetch one chunk per poll. Servers that ignore `Range` degrade to a
//! single-chunk transfer, and a `Content-Range` total repairs a failed
//! probe mid-flight. Nothing is fetched until the stream is polled, and
//! dropping it abandons the remainder without a wasted request.

pub mod download;

pub use download::{DEFAULT_CHUNK_SIZE, DownloadChunk, DownloadOptions, download};
