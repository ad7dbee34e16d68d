//! Stream-based transport strategy backed by reqwest.
//!
//! The request is driven by a spawned task: response body bytes are tee'd
//! into a download progress channel while being buffered for decoding, and
//! streaming upload bodies are wrapped to count bytes against their declared
//! length. The caller's cancellation token and a derived timeout compose
//! into one cooperative signal; whichever fires first determines the abort
//! reason, and the token is re-checked after the response resolves so a
//! fulfilled-but-stale response is still discarded.

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::{
    RequestResult, Transport, TransportRequest, decode_body, receiver_stream, wait_cancel,
    wait_timeout,
};
use crate::codec;
use crate::data::{ByteStream, Method, Payload, Progress, Response, ResponseBody, ResponseType};
use crate::error::{Error, Result};

/// Transport over a promise-returning fetch-like primitive with teeable
/// byte streams. This is the default strategy installed by
/// [`HttpClient::new`](crate::HttpClient::new).
pub struct StreamingTransport {
    client: reqwest::Client,
}

impl StreamingTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client })
    }

    /// Build over a pre-configured reqwest client (proxies, TLS options and
    /// the like stay the caller's concern).
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for StreamingTransport {
    async fn send(&self, mut request: TransportRequest) -> Result<RequestResult> {
        if !request.headers.contains("Accept")
            && let Some(hint) = accept_hint(request.response_type)
        {
            request.headers.insert("Accept", hint);
        }

        let (response_tx, response_rx) = oneshot::channel();
        let (download_tx, download_rx) = mpsc::unbounded_channel();
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();
        let has_upload = matches!(request.body, Some(Payload::Stream(_)));

        let client = self.client.clone();
        let cancel = request.cancel.clone();
        let timeout = request.timeout;

        tracing::debug!(method = %request.method, url = %request.url, "dispatching streaming request");

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = wait_cancel(cancel.clone()) => Err(Error::Canceled),
                _ = wait_timeout(timeout) => Err(Error::Timeout),
                result = drive(client, request, download_tx, upload_tx) => result,
            };
            // A response that raced a cancellation still loses.
            let outcome = match outcome {
                Ok(_) if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) => {
                    Err(Error::Canceled)
                }
                other => other,
            };
            let _ = response_tx.send(outcome);
        });

        Ok(RequestResult {
            response: Box::pin(async move {
                response_rx
                    .await
                    .map_err(|_| Error::Network("request task dropped".to_string()))?
            }),
            upload: has_upload.then(|| receiver_stream(upload_rx)),
            download: receiver_stream(download_rx),
        })
    }
}

/// Perform the round-trip: send, stream the body while emitting download
/// progress, then decode.
async fn drive(
    client: reqwest::Client,
    request: TransportRequest,
    download_tx: mpsc::UnboundedSender<Progress>,
    upload_tx: mpsc::UnboundedSender<Progress>,
) -> Result<Response> {
    let mut builder = client.request(to_reqwest_method(request.method), request.url);
    for (name, value) in request.headers.iter() {
        builder = builder.header(name.as_str(), value.to_string());
    }
    match request.body {
        Some(Payload::Bytes(data)) => builder = builder.body(data),
        Some(Payload::Stream(byte_stream)) => {
            let counted = counted_upload(byte_stream, upload_tx);
            builder = builder.body(reqwest::Body::wrap_stream(counted));
        }
        None => {}
    }

    let response = builder.send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    let status_text = status
        .canonical_reason()
        .unwrap_or_default()
        .to_string();
    let headers = codec::parse_header_block(&raw_header_block(response.headers()));
    let content_type = headers.get_str("Content-Type").unwrap_or_default().to_string();
    let total = headers.content_length();

    let mut body_stream = response.bytes_stream();
    let mut buffer = BytesMut::new();
    let mut loaded = 0u64;
    while let Some(chunk) = body_stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        loaded += chunk.len() as u64;
        buffer.extend_from_slice(&chunk);
        let _ = download_tx.send(Progress::new(loaded, total));
    }

    let body = if status.as_u16() == 204 {
        ResponseBody::None
    } else {
        decode_body(buffer.freeze(), &content_type, request.response_type)
    };

    Ok(Response {
        status: status.as_u16(),
        status_text,
        headers,
        body,
    })
}

/// Tee a streaming upload body: cumulative byte counts flow into the upload
/// progress channel while the bytes themselves reach the wire unchanged.
/// Errors are rendered as `io::Error` to satisfy the wire body's error
/// bound.
fn counted_upload(
    byte_stream: ByteStream,
    upload_tx: mpsc::UnboundedSender<Progress>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    let total = byte_stream.length;
    byte_stream
        .stream
        .scan(0u64, move |loaded, chunk| {
            if let Ok(ref data) = chunk {
                *loaded += data.len() as u64;
                let _ = upload_tx.send(Progress::new(*loaded, total));
            }
            futures_util::future::ready(Some(chunk))
        })
        .map(|chunk| chunk.map_err(|error| std::io::Error::other(error.to_string())))
}

/// Re-serialize response headers into a raw block so they flow through the
/// same canonicalizing parser as the event-driven strategy.
fn raw_header_block(headers: &reqwest::header::HeaderMap) -> String {
    let mut raw = String::new();
    for (name, value) in headers {
        raw.push_str(name.as_str());
        raw.push_str(": ");
        raw.push_str(&String::from_utf8_lossy(value.as_bytes()));
        raw.push('\n');
    }
    raw
}

/// The `Accept` hint derived from the requested response type.
fn accept_hint(response_type: Option<ResponseType>) -> Option<&'static str> {
    match response_type? {
        ResponseType::Text => Some("text/plain"),
        ResponseType::Json => Some("application/json"),
        ResponseType::Document => Some("text/html, application/xhtml+xml, application/xml"),
        ResponseType::Binary => Some("application/octet-stream"),
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Head => reqwest::Method::HEAD,
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_reqwest_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error.to_string())
    }
}
