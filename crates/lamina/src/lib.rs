//! Middleware-composable HTTP client over pluggable transport strategies.
//!
//! # Architecture
//!
//! This crate follows a layered pattern:
//! - [`data`] - Immutable request/response types and the closed body union
//! - [`codec`] - Pure content negotiation (no I/O)
//! - [`transport`] - I/O strategies behind the [`Transport`] trait
//! - [`stack`] - Onion-style middleware execution
//! - [`client`] - The client facade wiring the layers together
//!
//! # Key Features
//!
//! - **Onion execution**: middlewares run outer-to-inner before dispatch and
//!   unwind inner-to-outer afterwards, with an explicit, single-use
//!   continuation
//! - **Content negotiation**: request bodies are serialized from a declared
//!   or inferred media type; response bodies are parsed back by content type
//! - **Swappable transports**: a streaming strategy and an event-driven
//!   strategy share one `send` entry point, progress streams included
//! - **Mechanism-only**: no retries; cancellation and timeouts compose into
//!   one cooperative signal

pub mod client;
pub mod codec;
pub mod data;
pub mod error;
pub mod stack;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use data::{
    Body, ByteStream, Context, Document, FormPart, HeaderValue, Headers, LinkEntry, Method,
    Payload, Progress, Request, RequestOptions, Response, ResponseBody, ResponseType,
};
pub use error::{Error, HttpError, Result};
pub use stack::{Middleware, Next, Stack};
pub use transport::event::{
    AbortHandle, EventChannel, EventRequest, EventTransport, RawResponse, TransportEvent,
};
pub use transport::streaming::StreamingTransport;
pub use transport::{BoxStream, ProgressStream, RequestResult, Transport, TransportRequest};
