/// A single progress snapshot from an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Bytes transferred so far.
    pub loaded: u64,

    /// Total expected bytes, if known from a `Content-Length` header.
    ///
    /// `None` when the server doesn't declare a length (e.g. chunked
    /// transfer encoding).
    pub total: Option<u64>,
}

impl Progress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }

    /// Completion percentage, or `None` when the total is unknown or zero.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64) * 100.0),
            _ => None,
        }
    }

    /// Whether the transfer has reached a known total.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total.is_some_and(|total| self.loaded >= total)
    }
}
