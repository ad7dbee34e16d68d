//! Transport strategies behind a single `send` entry point.
//!
//! A strategy takes a fully-resolved [`TransportRequest`] and returns a
//! [`RequestResult`]: a response future plus pull-based progress streams for
//! each direction. Strategy choice is a configuration-time decision made
//! when the client is built; tests substitute their own implementations the
//! same way.

pub mod event;
pub mod streaming;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::codec;
use crate::data::{Headers, Method, Payload, Progress, Response, ResponseBody, ResponseType};
use crate::error::Result;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A finite, non-restartable sequence of progress snapshots. Consumers pull
/// at their own pace; dropping the stream discards further snapshots without
/// affecting the transfer.
pub type ProgressStream = BoxStream<'static, Progress>;

/// A fully-resolved request descriptor handed to a transport strategy: the
/// URL is absolute, the body is wire-ready, and options are already merged
/// with the client defaults.
#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Payload>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: bool,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

/// What a transport strategy returns per call: the response future resolves
/// once the full body has been received and parsed; the progress streams end
/// when the transfer settles (or once a known total is reached).
pub struct RequestResult {
    pub response: BoxFuture<'static, Result<Response>>,
    pub upload: Option<ProgressStream>,
    pub download: ProgressStream,
}

/// A concrete mechanism implementing the actual network call. The contract
/// is {send, observe-progress, cancel}: all I/O is asynchronous, and the
/// cancellation token in the descriptor must be honored at send time and
/// re-checked once the response resolves.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<RequestResult>> + Send;
}

/// Decode a raw body, honoring the caller's response-type hint before
/// falling back to content-type negotiation.
pub(crate) fn decode_body(
    raw: Bytes,
    content_type: &str,
    response_type: Option<ResponseType>,
) -> ResponseBody {
    match response_type {
        Some(ResponseType::Binary) => ResponseBody::Binary(raw),
        Some(ResponseType::Text) => {
            ResponseBody::Text(String::from_utf8_lossy(&raw).into_owned())
        }
        _ => codec::parse_body(raw, content_type),
    }
}

/// Adapt an unbounded receiver into a pull-based stream.
pub(crate) fn receiver_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<T>,
) -> BoxStream<'static, T> {
    Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// Resolves when the token fires; pends forever without one.
pub(crate) async fn wait_cancel(token: Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Resolves when the derived timeout elapses; pends forever without one.
pub(crate) async fn wait_timeout(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_type_hint_overrides_content_type() {
        let raw = Bytes::from_static(br#"{"k":1}"#);
        assert_eq!(
            decode_body(raw.clone(), "application/json", Some(ResponseType::Binary)),
            ResponseBody::Binary(raw.clone())
        );
        assert_eq!(
            decode_body(raw.clone(), "application/json", Some(ResponseType::Text)),
            ResponseBody::Text(r#"{"k":1}"#.to_string())
        );
        assert_eq!(
            decode_body(raw, "application/json", None),
            ResponseBody::Json(json!({"k": 1}))
        );
    }
}
