use std::collections::BTreeMap;
use std::fmt;

/// One parsed `Link` header relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub uri: String,
    pub rel: String,
    pub title: Option<String>,
}

/// A header value: the raw string, or a structured value produced by a
/// per-name sub-parser (currently only `Link`).
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Link(BTreeMap<String, LinkEntry>),
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            HeaderValue::Link(_) => None,
        }
    }

    pub fn as_link(&self) -> Option<&BTreeMap<String, LinkEntry>> {
        match self {
            HeaderValue::Link(map) => Some(map),
            HeaderValue::Text(_) => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(s) => f.write_str(s),
            HeaderValue::Link(map) => {
                let mut first = true;
                for entry in map.values() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "<{}>; rel=\"{}\"", entry.uri, entry.rel)?;
                    if let Some(ref title) = entry.title {
                        write!(f, "; title=\"{title}\"")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Header collection with case-insensitive, Train-Case canonical names.
///
/// Every key is canonicalized on insertion, so lookups with any casing hit
/// the same entry. Copying a `Headers` never aliases the source map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: BTreeMap<String, HeaderValue>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize a header name to Train-Case: the first letter of each
    /// hyphen-separated segment is uppercased, the rest lowercased.
    pub fn canonical_name(name: &str) -> String {
        name.split('-')
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => {
                        let mut out = first.to_ascii_uppercase().to_string();
                        out.push_str(&chars.as_str().to_ascii_lowercase());
                        out
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries.insert(
            Self::canonical_name(name.as_ref()),
            HeaderValue::Text(value.into()),
        );
    }

    pub fn insert_value(&mut self, name: impl AsRef<str>, value: HeaderValue) {
        self.entries
            .insert(Self::canonical_name(name.as_ref()), value);
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries.get(&Self::canonical_name(name))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::canonical_name(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.entries.remove(&Self::canonical_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `Content-Length` value, when present and numeric.
    pub fn content_length(&self) -> Option<u64> {
        self.get_str("Content-Length").and_then(|v| v.parse().ok())
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_train_case() {
        assert_eq!(Headers::canonical_name("content-type"), "Content-Type");
        assert_eq!(Headers::canonical_name("CONTENT-LENGTH"), "Content-Length");
        assert_eq!(Headers::canonical_name("x-request-id"), "X-Request-Id");
        assert_eq!(Headers::canonical_name("etag"), "Etag");
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut headers = Headers::new();
        headers.insert("content-TYPE", "application/json");
        assert_eq!(headers.get_str("Content-Type"), Some("application/json"));
        assert_eq!(headers.get_str("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn copies_do_not_alias() {
        let mut base = Headers::new();
        base.insert("Accept", "text/plain");
        let mut copy = base.clone();
        copy.insert("Accept", "application/json");
        assert_eq!(base.get_str("Accept"), Some("text/plain"));
    }
}
