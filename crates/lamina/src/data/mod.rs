//! Immutable data types threaded through the middleware stack.
//!
//! These types carry no I/O. A [`Context`] and its [`Headers`] copy are
//! exclusively owned by one request execution and never shared across
//! concurrent calls.

pub mod body;
pub mod context;
pub mod headers;
pub mod method;
pub mod options;
pub mod progress;

pub use body::{Body, ByteStream, Document, FormPart, Payload, ResponseBody};
pub use context::{Context, Request, Response};
pub use headers::{HeaderValue, Headers, LinkEntry};
pub use method::Method;
pub use options::{RequestOptions, ResponseType};
pub use progress::Progress;
