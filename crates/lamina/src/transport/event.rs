//! Event-driven transport strategy.
//!
//! Works over a legacy request primitive exposing open/send/abort semantics
//! and emitting terminal and progress notifications. The strategy demuxes
//! the primitive's event sequence into per-direction progress streams and a
//! response future, and tears everything down on every exit path. Test
//! harnesses substitute scripted primitives to exercise either availability
//! scenario.

use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    BoxStream, RequestResult, Transport, TransportRequest, decode_body, receiver_stream,
    wait_cancel,
};
use crate::codec;
use crate::data::{Method, Payload, Progress, Response, ResponseType};
use crate::error::{Error, Result};

/// A notification emitted by an event-driven request primitive.
#[derive(Debug)]
pub enum TransportEvent {
    UploadProgress(Progress),
    DownloadProgress(Progress),
    /// Terminal ready state, carrying whatever the primitive received. An
    /// aborted request settles with status 0.
    Settled(RawResponse),
    /// The primitive's error notification (connection failure and the like).
    Failed(String),
    /// The primitive's own timeout elapsed.
    TimedOut,
}

/// The unparsed terminal state of an event-driven request.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// CRLF/LF-delimited `Name: value` block, exactly as received.
    pub raw_headers: String,
    pub body: Bytes,
}

/// Aborts the in-flight native request when invoked. Dropping the handle
/// releases it without aborting.
pub struct AbortHandle(Box<dyn Fn() + Send + Sync>);

impl AbortHandle {
    pub fn new(abort: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Box::new(abort))
    }

    pub fn abort(&self) {
        (self.0)()
    }
}

/// What a primitive hands back once the request is on the wire.
pub struct EventChannel {
    pub events: BoxStream<'static, TransportEvent>,
    pub abort: AbortHandle,
}

/// The external transport primitive contract: open a connection, attach
/// headers and options, send the serialized body, and deliver progress and
/// terminal notifications as an event sequence.
pub trait EventRequest: Send + 'static {
    fn open(&mut self, method: Method, url: &Url) -> Result<()>;
    fn set_header(&mut self, name: &str, value: &str);
    fn configure(
        &mut self,
        with_credentials: bool,
        timeout: Option<Duration>,
        response_type: Option<ResponseType>,
    );
    fn send(self: Box<Self>, body: Option<Payload>) -> EventChannel;
}

/// Transport over a caller-supplied [`EventRequest`] factory. A fresh
/// primitive is created per call.
pub struct EventTransport<F> {
    factory: F,
}

impl<F, R> EventTransport<F>
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EventRequest,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F, R> Transport for EventTransport<F>
where
    F: Fn() -> R + Send + Sync + 'static,
    R: EventRequest,
{
    async fn send(&self, request: TransportRequest) -> Result<RequestResult> {
        let mut primitive = (self.factory)();
        primitive.open(request.method, &request.url)?;
        for (name, value) in request.headers.iter() {
            primitive.set_header(name, &value.to_string());
        }
        primitive.configure(
            request.with_credentials,
            request.timeout,
            request.response_type,
        );

        tracing::debug!(method = %request.method, url = %request.url, "dispatching event-driven request");

        let EventChannel { mut events, abort } = Box::new(primitive).send(request.body);

        let cancel = request.cancel.clone();
        let response_type = request.response_type;
        let (response_tx, response_rx) = oneshot::channel();
        let (download_tx, download_rx) = mpsc::unbounded_channel();
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let outcome = loop {
                tokio::select! {
                    _ = wait_cancel(cancel.clone()) => {
                        abort.abort();
                        break Err(Error::Canceled);
                    }
                    event = events.next() => match event {
                        Some(TransportEvent::UploadProgress(progress)) => {
                            let _ = upload_tx.send(progress);
                        }
                        Some(TransportEvent::DownloadProgress(progress)) => {
                            let _ = download_tx.send(progress);
                        }
                        Some(TransportEvent::Settled(raw)) => {
                            break settle(raw, cancel.as_ref(), response_type);
                        }
                        Some(TransportEvent::Failed(message)) => {
                            break Err(Error::Network(message));
                        }
                        Some(TransportEvent::TimedOut) => break Err(Error::Timeout),
                        None => {
                            break Err(Error::Network(
                                "transport primitive closed without settling".to_string(),
                            ));
                        }
                    }
                }
            };
            // Listener release on every exit path: dropping the event stream
            // and abort handle detaches from the primitive.
            drop(events);
            drop(abort);
            let _ = response_tx.send(outcome);
        });

        Ok(RequestResult {
            response: Box::pin(async move {
                response_rx
                    .await
                    .map_err(|_| Error::Network("request task dropped".to_string()))?
            }),
            upload: Some(receiver_stream(upload_rx)),
            download: receiver_stream(download_rx),
        })
    }
}

/// Turn a terminal event into a response. A settle without a status only
/// resolves through the cancellation path; a fulfilled response that raced
/// a cancellation is likewise discarded.
fn settle(
    raw: RawResponse,
    cancel: Option<&CancellationToken>,
    response_type: Option<ResponseType>,
) -> Result<Response> {
    let canceled = cancel.is_some_and(|token| token.is_cancelled());
    if raw.status == 0 {
        return Err(if canceled {
            Error::Canceled
        } else {
            Error::Network("connection closed before a status was received".to_string())
        });
    }
    if canceled {
        return Err(Error::Canceled);
    }

    let headers = codec::parse_header_block(&raw.raw_headers);
    let content_type = headers
        .get_str("Content-Type")
        .unwrap_or_default()
        .to_string();
    let body = decode_body(raw.body, &content_type, response_type);
    Ok(Response {
        status: raw.status,
        status_text: raw.status_text,
        headers,
        body,
    })
}
