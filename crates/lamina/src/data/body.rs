use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::transport::BoxStream;

/// A streaming byte payload with an optionally declared length (typically
/// from a `Content-Length` header the caller already knows).
pub struct ByteStream {
    pub stream: BoxStream<'static, Result<Bytes>>,
    pub length: Option<u64>,
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// One part of a multipart form payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into().into_bytes()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data,
        }
    }
}

/// Already-rendered markup with an optional declared media type. When the
/// type is absent the codec infers one from the root tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub content_type: Option<String>,
    pub text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            content_type: None,
            text: text.into(),
        }
    }

    pub fn with_type(content_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            text: text.into(),
        }
    }
}

/// The closed set of request body kinds, resolved once at the API boundary
/// so downstream code matches instead of re-probing runtime shapes.
#[derive(Default)]
pub enum Body {
    #[default]
    None,
    /// A structured value awaiting JSON serialization.
    Json(serde_json::Value),
    /// A plain text payload, passed through unchanged.
    Text(String),
    /// Key/value pairs awaiting percent-encoding.
    Form(Vec<(String, String)>),
    /// An already percent-encoded query string.
    UrlEncoded(String),
    /// A structured multi-part form payload.
    Multipart(Vec<FormPart>),
    /// Already-rendered markup (html, svg, or xml).
    Markup(Document),
    /// Raw binary data.
    Bytes(Bytes),
    /// A streaming byte payload.
    Stream(ByteStream),
}

impl Body {
    /// Structured values go through the codec in the default middleware;
    /// `None` and plain text do not.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Body::None | Body::Text(_))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::None => f.write_str("None"),
            Body::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Body::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Body::Form(pairs) => f.debug_tuple("Form").field(pairs).finish(),
            Body::UrlEncoded(s) => f.debug_tuple("UrlEncoded").field(s).finish(),
            Body::Multipart(parts) => f.debug_tuple("Multipart").field(parts).finish(),
            Body::Markup(doc) => f.debug_tuple("Markup").field(doc).finish(),
            Body::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Body::Stream(s) => f.debug_tuple("Stream").field(s).finish(),
        }
    }
}

/// A wire-ready payload produced by body serialization.
pub enum Payload {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl Payload {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(b) => Some(b),
            Payload::Stream(_) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Payload::Stream(s) => f.debug_tuple("Stream").field(s).finish(),
        }
    }
}

/// A response body, typed by the response content type (or by the caller's
/// requested response type).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    None,
    Json(serde_json::Value),
    Document(Document),
    Text(String),
    Binary(Bytes),
}

impl ResponseBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(s) => Some(s),
            ResponseBody::Document(doc) => Some(&doc.text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Decode the body into a typed value. JSON bodies deserialize directly;
    /// text bodies are parsed as JSON text.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            ResponseBody::Json(v) => {
                serde_json::from_value(v.clone()).map_err(|e| Error::Decode(e.to_string()))
            }
            ResponseBody::Text(s) => {
                serde_json::from_str(s).map_err(|e| Error::Decode(e.to_string()))
            }
            other => Err(Error::Decode(format!(
                "body is not JSON-decodable: {other:?}"
            ))),
        }
    }
}
