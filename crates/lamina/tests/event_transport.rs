//! Event-driven transport behavior over scripted request primitives.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;

use lamina::{
    AbortHandle, Error, EventChannel, EventRequest, EventTransport, Headers, HttpClient, Method,
    Payload, Progress, RawResponse, RequestOptions, ResponseType, Transport, TransportEvent,
    TransportRequest,
};

/// A primitive that replays a fixed event script after `send`.
struct ScriptedRequest {
    events: Vec<TransportEvent>,
    hang: bool,
    aborted: Arc<AtomicBool>,
}

impl EventRequest for ScriptedRequest {
    fn open(&mut self, _method: Method, _url: &Url) -> lamina::Result<()> {
        Ok(())
    }

    fn set_header(&mut self, _name: &str, _value: &str) {}

    fn configure(
        &mut self,
        _with_credentials: bool,
        _timeout: Option<Duration>,
        _response_type: Option<ResponseType>,
    ) {
    }

    fn send(self: Box<Self>, _body: Option<Payload>) -> EventChannel {
        let aborted = self.aborted.clone();
        let events: lamina::BoxStream<'static, TransportEvent> = if self.hang {
            Box::pin(futures_util::stream::pending())
        } else {
            Box::pin(futures_util::stream::iter(self.events))
        };
        EventChannel {
            events,
            abort: AbortHandle::new(move || aborted.store(true, Ordering::SeqCst)),
        }
    }
}

fn scripted<F>(script: F) -> (EventTransport<impl Fn() -> ScriptedRequest>, Arc<AtomicBool>)
where
    F: Fn() -> Vec<TransportEvent> + Send + Sync + 'static,
{
    let aborted = Arc::new(AtomicBool::new(false));
    let flag = aborted.clone();
    let transport = EventTransport::new(move || ScriptedRequest {
        events: script(),
        hang: false,
        aborted: flag.clone(),
    });
    (transport, aborted)
}

fn descriptor(cancel: Option<CancellationToken>) -> TransportRequest {
    TransportRequest {
        method: Method::Get,
        url: Url::parse("https://api.test/resource").unwrap(),
        headers: Headers::new(),
        body: None,
        response_type: None,
        with_credentials: false,
        timeout: None,
        cancel,
    }
}

fn settled(status: u16, status_text: &str, raw_headers: &str, body: &'static [u8]) -> TransportEvent {
    TransportEvent::Settled(RawResponse {
        status,
        status_text: status_text.to_string(),
        raw_headers: raw_headers.to_string(),
        body: Bytes::from_static(body),
    })
}

#[tokio::test]
async fn settled_events_become_parsed_responses() {
    let (transport, _) = scripted(|| {
        vec![settled(
            200,
            "OK",
            "Content-Type: application/json\r\nX-Request-Id: 7\r\n",
            br#"{"ok":true}"#,
        )]
    });

    let result = transport.send(descriptor(None)).await.unwrap();
    let response = result.response.await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.headers.get_str("X-Request-Id"), Some("7"));
    assert_eq!(response.body.as_json(), Some(&json!({"ok": true})));
}

#[tokio::test]
async fn progress_events_are_demuxed_per_direction() {
    let (transport, _) = scripted(|| {
        vec![
            TransportEvent::UploadProgress(Progress::new(5, Some(10))),
            TransportEvent::UploadProgress(Progress::new(10, Some(10))),
            TransportEvent::DownloadProgress(Progress::new(3, Some(3))),
            settled(200, "OK", "Content-Type: text/plain\r\n", b"done"),
        ]
    });

    let result = transport.send(descriptor(None)).await.unwrap();
    let response = result.response.await.unwrap();
    assert_eq!(response.text(), Some("done"));

    let upload: Vec<Progress> = result.upload.unwrap().collect().await;
    assert_eq!(upload.len(), 2);
    assert_eq!(upload[1].loaded, 10);
    let download: Vec<Progress> = result.download.collect().await;
    assert_eq!(download.len(), 1);
    assert_eq!(download[0].percentage(), Some(100.0));
}

#[tokio::test]
async fn statusless_settle_without_cancellation_is_a_network_error() {
    let (transport, _) = scripted(|| vec![settled(0, "", "", b"")]);

    let result = transport.send(descriptor(None)).await.unwrap();
    let error = result.response.await.unwrap_err();
    assert!(matches!(error, Error::Network(_)));
    assert!(!error.is_cancellation());
}

#[tokio::test]
async fn statusless_settle_after_cancellation_is_canceled() {
    let (transport, _) = scripted(|| vec![settled(0, "", "", b"")]);
    let token = CancellationToken::new();
    token.cancel();

    let result = transport.send(descriptor(Some(token))).await.unwrap();
    let error = result.response.await.unwrap_err();
    assert!(matches!(error, Error::Canceled));
}

#[tokio::test]
async fn fulfilled_settle_after_cancellation_is_discarded() {
    let (transport, _) = scripted(|| {
        vec![settled(
            200,
            "OK",
            "Content-Type: text/plain\r\n",
            b"stale body",
        )]
    });
    let token = CancellationToken::new();
    token.cancel();

    let result = transport.send(descriptor(Some(token))).await.unwrap();
    let error = result.response.await.unwrap_err();
    assert!(matches!(error, Error::Canceled));
}

#[tokio::test]
async fn cancellation_aborts_a_hanging_request() {
    let aborted = Arc::new(AtomicBool::new(false));
    let flag = aborted.clone();
    let transport = EventTransport::new(move || ScriptedRequest {
        events: Vec::new(),
        hang: true,
        aborted: flag.clone(),
    });
    let token = CancellationToken::new();

    let result = transport.send(descriptor(Some(token.clone()))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let error = result.response.await.unwrap_err();
    assert!(matches!(error, Error::Canceled));
    assert!(aborted.load(Ordering::SeqCst));
}

#[tokio::test]
async fn failure_and_timeout_events_map_to_their_errors() {
    let (transport, _) = scripted(|| vec![TransportEvent::Failed("connection reset".to_string())]);
    let result = transport.send(descriptor(None)).await.unwrap();
    assert!(matches!(
        result.response.await.unwrap_err(),
        Error::Network(_)
    ));

    let (transport, _) = scripted(|| vec![TransportEvent::TimedOut]);
    let result = transport.send(descriptor(None)).await.unwrap();
    assert!(matches!(result.response.await.unwrap_err(), Error::Timeout));
}

#[tokio::test]
async fn event_transport_composes_with_the_client() {
    let (transport, _) = scripted(|| {
        vec![settled(
            200,
            "OK",
            "Content-Type: application/json\r\nLink: <https://api.test/page/2>; rel=\"next\"\r\n",
            br#"{"page":1}"#,
        )]
    });
    let client = HttpClient::with_transport(transport);

    let response = client
        .get("https://api.test/page/1", Headers::new(), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(response.body.as_json(), Some(&json!({"page": 1})));
    assert_eq!(response.link("next").unwrap().uri, "https://api.test/page/2");
}
