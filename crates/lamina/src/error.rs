//! Error types for lamina.

use thiserror::Error;

use crate::data::{Request, Response};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No serialization strategy matched the outgoing body. The request is
    /// never sent.
    #[error("no serialization strategy for request body: {0}")]
    Serialize(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Network-level failure surfaced by the active transport strategy.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("request canceled")]
    Canceled,

    /// A completed round-trip whose status was 300 or above.
    #[error(transparent)]
    Http(#[from] Box<HttpError>),

    /// A typed accessor could not decode the response body. Content-type
    /// driven parsing never raises this; it degrades to raw text instead.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl Error {
    /// Whether this error came from the cooperative cancellation path
    /// (caller signal or derived timeout) rather than the wire.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Canceled | Error::Timeout)
    }

    /// The HTTP error payload, when the round-trip itself succeeded.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

/// Raised by the client's default middleware for statuses above 299. Carries
/// the originating request and the full response so callers can branch on
/// status or body.
#[derive(Debug, Error)]
#[error("HTTP {status} {status_text}")]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
    pub request: Request,
    pub response: Response,
}

impl HttpError {
    pub fn into_error(self) -> Error {
        Error::Http(Box::new(self))
    }
}
