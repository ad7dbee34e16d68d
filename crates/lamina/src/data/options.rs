use std::time::Duration;

/// The caller's hint for how the response body should be decoded. When
/// absent, decoding is driven by the response content type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Text,
    Json,
    Document,
    Binary,
}

/// Per-request options. Unset fields fall back to the client's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub credentials: Option<bool>,
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials(mut self, with_credentials: bool) -> Self {
        self.credentials = Some(with_credentials);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Resolve against a set of defaults; per-call values win.
    pub fn merge(self, defaults: &RequestOptions) -> RequestOptions {
        RequestOptions {
            credentials: self.credentials.or(defaults.credentials),
            timeout: self.timeout.or(defaults.timeout),
            response_type: self.response_type.or(defaults.response_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_per_call_values() {
        let defaults = RequestOptions::new()
            .timeout(Duration::from_secs(30))
            .credentials(true);
        let merged = RequestOptions::new()
            .timeout(Duration::from_secs(5))
            .merge(&defaults);
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
        assert_eq!(merged.credentials, Some(true));
        assert_eq!(merged.response_type, None);
    }
}
