//! The chunked download state machine.

use bytes::Bytes;
use futures_util::Stream;
use futures_util::stream::try_unfold;
use lamina::codec::content_range_total;
use lamina::{Headers, HttpClient, RequestOptions, ResponseType, Result, Transport};

/// Chunk size used when the caller does not pick one.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Byte-range and chunking parameters for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Offset of the first byte to fetch; a previously interrupted transfer
    /// resumes by passing the number of bytes it already holds.
    pub start: u64,
    /// Exclusive end offset; `None` runs to the end of the resource.
    pub end: Option<u64>,
    pub chunk_size: u64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// One fetched chunk with a progress snapshot. `loaded` and `total` are
/// absolute byte positions in the resource, so a resumed transfer reports
/// where it stands in the whole file rather than in its own range.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadChunk {
    pub loaded: u64,
    pub total: Option<u64>,
    /// Completion in percent, rounded to two decimals. `None` while the
    /// total is unknown.
    pub percent: Option<f64>,
    pub data: Bytes,
}

struct DownloadState<'a, T: Transport> {
    client: &'a HttpClient<T>,
    path: String,
    options: DownloadOptions,
    offset: u64,
    resource_total: Option<u64>,
    probed: bool,
    done: bool,
}

impl<T: Transport> DownloadState<'_, T> {
    /// The byte position where this download ends: the resource size,
    /// clamped by an explicit `end`. Unknown until a probe or
    /// `Content-Range` total arrives.
    fn total(&self) -> Option<u64> {
        let resource = self.resource_total?;
        Some(self.options.end.map_or(resource, |end| end.min(resource)))
    }
}

/// Download a resource in sequential ranged chunks, yielding one
/// progress-annotated chunk per poll.
///
/// The first poll issues a `HEAD` probe for the resource size; a failed
/// probe is logged and the size stays unknown until a `206` response's
/// `Content-Range` supplies it. A non-`206` response means the server
/// ignored the range, so its full body is yielded as a single terminal
/// chunk. Error statuses and transport failures end the stream with the
/// error, except a `416` after at least one delivered chunk, which simply
/// ends a download whose total was never learned.
pub fn download<'a, T: Transport>(
    client: &'a HttpClient<T>,
    path: impl Into<String>,
    options: DownloadOptions,
) -> impl Stream<Item = Result<DownloadChunk>> + 'a {
    let state = DownloadState {
        client,
        path: path.into(),
        offset: options.start,
        options,
        resource_total: None,
        probed: false,
        done: false,
    };

    try_unfold(state, |mut state| async move {
        if state.done {
            return Ok(None);
        }

        if !state.probed {
            state.probed = true;
            match state
                .client
                .head(state.path.clone(), Headers::new(), RequestOptions::new())
                .await
            {
                Ok(headers) => state.resource_total = headers.content_length(),
                Err(error) => {
                    tracing::warn!(path = %state.path, %error, "size probe failed, continuing without a total");
                }
            }
        }
        if let Some(total) = state.total()
            && state.offset >= total
        {
            return Ok(None);
        }

        let last_byte = match state.options.end {
            Some(end) => (state.offset + state.options.chunk_size - 1).min(end.saturating_sub(1)),
            None => state.offset + state.options.chunk_size - 1,
        };
        let mut headers = Headers::new();
        headers.insert("Range", format!("bytes={}-{}", state.offset, last_byte));

        let response = match state
            .client
            .get(
                state.path.clone(),
                headers,
                RequestOptions::new().response_type(ResponseType::Binary),
            )
            .await
        {
            Ok(response) => response,
            // A range past the end after delivered chunks means the
            // resource ran out before a total was ever learned.
            Err(error)
                if state.offset > state.options.start
                    && error.http().is_some_and(|http| http.status == 416) =>
            {
                return Ok(None);
            }
            Err(error) => return Err(error),
        };

        let data = response
            .body
            .as_bytes()
            .cloned()
            .unwrap_or_else(Bytes::new);

        let chunk = if response.status == 206 {
            if let Some(total) = response
                .headers
                .get_str("Content-Range")
                .and_then(content_range_total)
            {
                state.resource_total = Some(total);
            }
            if data.is_empty() {
                return Ok(None);
            }
            state.offset += data.len() as u64;
            let total = state.total();
            state.done = match total {
                Some(total) => state.offset >= total,
                // Without a total, a short chunk is the only end signal.
                None => (data.len() as u64) < state.options.chunk_size,
            };
            tracing::debug!(
                path = %state.path,
                loaded = state.offset,
                total = ?total,
                "fetched chunk"
            );
            DownloadChunk {
                loaded: state.offset,
                total,
                percent: percent(state.offset, total),
                data,
            }
        } else {
            // The server ignored the range and sent everything it has.
            state.offset += data.len() as u64;
            state.done = true;
            DownloadChunk {
                loaded: state.offset,
                total: Some(state.offset),
                percent: Some(100.0),
                data,
            }
        };

        Ok(Some((chunk, state)))
    })
}

/// Completion ratio in percent, rounded to two decimals.
fn percent(loaded: u64, total: Option<u64>) -> Option<f64> {
    let total = total.filter(|total| *total > 0)?;
    Some((loaded as f64 / total as f64 * 10_000.0).round() / 100.0)
}
