use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::body::{Body, ResponseBody};
use super::headers::{Headers, LinkEntry};
use super::method::Method;
use super::options::RequestOptions;
use crate::error::Result;

/// One logical request as the caller describes it. The path may be relative;
/// the client resolves it against its base URI at dispatch time.
#[derive(Debug, Default)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: Headers,
    pub body: Body,
    pub options: RequestOptions,
    pub cancel: Option<CancellationToken>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// The uniform response produced by either transport strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl Response {
    /// Decode the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.body.decode()
    }

    pub fn text(&self) -> Option<&str> {
        self.body.as_text()
    }

    /// A parsed `Link` header relation, when present.
    pub fn link(&self, rel: &str) -> Option<&LinkEntry> {
        self.headers
            .get("Link")
            .and_then(|value| value.as_link())
            .and_then(|map| map.get(rel))
    }
}

/// The mutable request/response pair threaded through one execution of the
/// middleware stack. Created fresh per call, never reused.
#[derive(Debug, Default)]
pub struct Context {
    pub request: Request,
    pub response: Response,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
        }
    }
}
