//! Download orchestration against an in-memory ranged transport.

use bytes::Bytes;
use futures_util::TryStreamExt;
use lamina::{
    Error, Headers, HttpClient, Method, RequestResult, Response, ResponseBody, Transport,
    TransportRequest,
};
use lamina_fetch::{DownloadOptions, download};

/// Serves a fixed byte blob. Honors `Range` with `206` + `Content-Range`
/// unless told to ignore it, answers out-of-bounds ranges with `416`, and
/// can refuse `HEAD` probes or withhold `Content-Range`.
struct RangedServer {
    data: Bytes,
    honor_range: bool,
    fail_head: bool,
    send_content_range: bool,
}

impl RangedServer {
    fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            honor_range: true,
            fail_head: false,
            send_content_range: true,
        }
    }

    fn ignoring_ranges(mut self) -> Self {
        self.honor_range = false;
        self
    }

    fn refusing_head(mut self) -> Self {
        self.fail_head = true;
        self
    }

    fn omitting_content_range(mut self) -> Self {
        self.send_content_range = false;
        self
    }
}

impl Transport for RangedServer {
    async fn send(&self, request: TransportRequest) -> lamina::Result<RequestResult> {
        let response = match request.method {
            Method::Head => {
                if self.fail_head {
                    return Err(Error::Network("probe refused".to_string()));
                }
                let mut headers = Headers::new();
                headers.insert("Content-Length", self.data.len().to_string());
                Response {
                    status: 200,
                    status_text: "OK".to_string(),
                    headers,
                    body: ResponseBody::None,
                }
            }
            Method::Get => {
                let range = request
                    .headers
                    .get_str("Range")
                    .and_then(parse_range)
                    .filter(|_| self.honor_range);
                match range {
                    Some((first, _)) if first >= self.data.len() => Response {
                        status: 416,
                        status_text: "Range Not Satisfiable".to_string(),
                        headers: Headers::new(),
                        body: ResponseBody::None,
                    },
                    Some((first, last)) => {
                        let last = last.min(self.data.len() - 1);
                        let mut headers = Headers::new();
                        if self.send_content_range {
                            headers.insert(
                                "Content-Range",
                                format!("bytes {first}-{last}/{}", self.data.len()),
                            );
                        }
                        Response {
                            status: 206,
                            status_text: "Partial Content".to_string(),
                            headers,
                            body: ResponseBody::Binary(self.data.slice(first..=last)),
                        }
                    }
                    None => Response {
                        status: 200,
                        status_text: "OK".to_string(),
                        headers: Headers::new(),
                        body: ResponseBody::Binary(self.data.clone()),
                    },
                }
            }
            other => panic!("unexpected method {other}"),
        };
        Ok(RequestResult {
            response: Box::pin(futures_util::future::ready(Ok(response))),
            upload: None,
            download: Box::pin(futures_util::stream::empty()),
        })
    }
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (first, last) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((first.parse().ok()?, last.parse().ok()?))
}

#[tokio::test]
async fn even_chunks_yield_one_snapshot_each() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]));
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].loaded, 4);
    assert_eq!(chunks[0].total, Some(8));
    assert_eq!(chunks[0].percent, Some(50.0));
    assert_eq!(chunks[1].loaded, 8);
    assert_eq!(chunks[1].percent, Some(100.0));

    let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.to_vec()).collect();
    assert_eq!(joined, b"abcdefgh");
}

#[tokio::test]
async fn uneven_tail_chunk_completes_the_span() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]));
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().chunk_size(3),
    )
    .try_collect()
    .await
    .unwrap();

    let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
    assert_eq!(sizes, vec![3, 3, 2]);
    assert_eq!(chunks.last().unwrap().percent, Some(100.0));
}

#[tokio::test]
async fn range_ignoring_server_degrades_to_one_chunk() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]).ignoring_ranges());
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].loaded, 8);
    assert_eq!(chunks[0].total, Some(8));
    assert_eq!(chunks[0].percent, Some(100.0));
    assert_eq!(&chunks[0].data[..], b"abcdefgh");
}

#[tokio::test]
async fn content_range_repairs_a_failed_probe() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]).refusing_head());
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    // The first ranged response already carries the repaired total.
    assert_eq!(chunks[0].total, Some(8));
    assert_eq!(chunks[0].percent, Some(50.0));
    assert_eq!(chunks.len(), 2);
}

#[tokio::test]
async fn resumes_from_a_byte_offset() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]));
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().start(4).chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(&chunks[0].data[..], b"efgh");
    assert_eq!(chunks[0].loaded, 8);
    assert_eq!(chunks[0].total, Some(8));
    assert_eq!(chunks[0].percent, Some(100.0));
}

#[tokio::test]
async fn resumed_snapshots_report_absolute_progress() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]));
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().start(4).chunk_size(2),
    )
    .try_collect()
    .await
    .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].loaded, 6);
    assert_eq!(chunks[0].total, Some(8));
    assert_eq!(chunks[0].percent, Some(75.0));
    assert_eq!(chunks[1].loaded, 8);
    assert_eq!(chunks[1].percent, Some(100.0));
}

#[tokio::test]
async fn untotaled_exact_multiple_ends_cleanly_on_416() {
    let client = HttpClient::with_transport(
        RangedServer::new(&b"abcdefgh"[..])
            .refusing_head()
            .omitting_content_range(),
    );
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    // Two full chunks, then the over-the-end probe is absorbed.
    let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
    assert_eq!(sizes, vec![4, 4]);
    assert!(chunks.iter().all(|c| c.total.is_none()));
    assert!(chunks.iter().all(|c| c.percent.is_none()));
}

#[tokio::test]
async fn bounded_end_stops_before_the_resource_ends() {
    let client = HttpClient::with_transport(RangedServer::new(&b"abcdefgh"[..]));
    let chunks: Vec<_> = download(
        &client,
        "https://files.test/blob",
        DownloadOptions::new().end(6).chunk_size(4),
    )
    .try_collect()
    .await
    .unwrap();

    let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
    assert_eq!(sizes, vec![4, 2]);
    assert_eq!(chunks[1].total, Some(6));
    assert_eq!(chunks[1].percent, Some(100.0));
}
