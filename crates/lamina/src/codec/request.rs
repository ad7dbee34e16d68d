//! Outgoing body serialization.
//!
//! Strategy selection follows the declared `Content-Type` when the caller
//! set one, and otherwise infers from the body kind. A body that matches no
//! strategy (e.g. JSON serialization itself failing) is rejected before any
//! request is sent.

use bytes::Bytes;
use uuid::Uuid;

use crate::data::{Body, Document, FormPart, Payload};
use crate::error::{Error, Result};

/// A wire-ready payload plus the media type the serialization strategy
/// produced, if any.
#[derive(Debug)]
pub struct Encoded {
    pub payload: Payload,
    pub content_type: Option<String>,
}

impl Encoded {
    fn bytes(data: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            payload: Payload::Bytes(data.into()),
            content_type,
        }
    }
}

/// Serialize a request body. `declared` is the caller-set `Content-Type`,
/// when present.
pub fn serialize_body(body: Body, declared: Option<&str>) -> Result<Encoded> {
    match declared {
        Some(content_type) => serialize_declared(body, content_type),
        None => serialize_inferred(body),
    }
}

/// Dispatch on an explicitly declared media type. An unrecognized type
/// passes the body through unchanged.
fn serialize_declared(body: Body, content_type: &str) -> Result<Encoded> {
    if content_type.starts_with("application/x-www-form-urlencoded") {
        return match body {
            Body::Form(pairs) => Ok(Encoded::bytes(encode_pairs(&pairs), None)),
            Body::UrlEncoded(encoded) => Ok(Encoded::bytes(encoded, None)),
            Body::Json(value) => {
                let pairs = json_to_pairs(&value)?;
                Ok(Encoded::bytes(encode_pairs(&pairs), None))
            }
            other => passthrough(other),
        };
    }
    if content_type.starts_with("multipart/form-data") {
        return match body {
            Body::Multipart(parts) => Ok(encode_multipart(&parts)),
            other => passthrough(other),
        };
    }
    if content_type.contains("json") {
        return match body {
            Body::Json(value) => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                Ok(Encoded::bytes(text, None))
            }
            other => passthrough(other),
        };
    }
    if content_type.contains("html") || content_type.contains("xml") || content_type.contains("svg")
    {
        return match body {
            Body::Markup(doc) => Ok(Encoded::bytes(doc.text, None)),
            other => passthrough(other),
        };
    }
    passthrough(body)
}

/// No declared type: infer a strategy from the body kind, in priority order.
fn serialize_inferred(body: Body) -> Result<Encoded> {
    match body {
        Body::UrlEncoded(encoded) => Ok(Encoded::bytes(
            encoded,
            Some("application/x-www-form-urlencoded".to_string()),
        )),
        Body::Form(pairs) => Ok(Encoded::bytes(
            encode_pairs(&pairs),
            Some("application/x-www-form-urlencoded".to_string()),
        )),
        Body::Multipart(parts) => Ok(encode_multipart(&parts)),
        Body::Markup(doc) => {
            let content_type = markup_type(&doc);
            Ok(Encoded::bytes(doc.text, Some(content_type)))
        }
        Body::Bytes(data) => Ok(Encoded::bytes(
            data,
            Some("application/octet-stream".to_string()),
        )),
        Body::Stream(stream) => Ok(Encoded {
            payload: Payload::Stream(stream),
            content_type: Some("application/octet-stream".to_string()),
        }),
        Body::Json(value) => {
            let text =
                serde_json::to_string(&value).map_err(|e| Error::Serialize(e.to_string()))?;
            Ok(Encoded::bytes(text, Some("application/json".to_string())))
        }
        Body::Text(text) => Ok(Encoded::bytes(text, None)),
        Body::None => Err(Error::Serialize("no request body to serialize".into())),
    }
}

fn passthrough(body: Body) -> Result<Encoded> {
    let payload = match body {
        Body::Bytes(data) => Payload::Bytes(data),
        Body::Text(text) => Payload::Bytes(Bytes::from(text.into_bytes())),
        Body::UrlEncoded(encoded) => Payload::Bytes(Bytes::from(encoded.into_bytes())),
        Body::Markup(doc) => Payload::Bytes(Bytes::from(doc.text.into_bytes())),
        Body::Stream(stream) => Payload::Stream(stream),
        Body::Json(value) => {
            let text =
                serde_json::to_string(&value).map_err(|e| Error::Serialize(e.to_string()))?;
            Payload::Bytes(Bytes::from(text.into_bytes()))
        }
        other => {
            return Err(Error::Serialize(format!(
                "body kind {other:?} cannot pass through unchanged"
            )));
        }
    };
    Ok(Encoded {
        payload,
        content_type: None,
    })
}

/// Infer a media type for rendered markup: declared type wins, then the
/// root tag decides (svg, html-like, else xml).
fn markup_type(doc: &Document) -> String {
    if let Some(ref declared) = doc.content_type {
        return declared.clone();
    }
    let head = doc.text.trim_start().to_ascii_lowercase();
    if head.starts_with("<svg") {
        "image/svg".to_string()
    } else if head.starts_with("<!doctype html") || head.starts_with("<html") {
        "text/html".to_string()
    } else {
        "application/xml".to_string()
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Flatten a JSON object into form pairs; arrays repeat the key.
fn json_to_pairs(value: &serde_json::Value) -> Result<Vec<(String, String)>> {
    let object = value.as_object().ok_or_else(|| {
        Error::Serialize("form-urlencoded bodies require a JSON object".to_string())
    })?;
    let mut pairs = Vec::with_capacity(object.len());
    for (key, value) in object {
        match value {
            serde_json::Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_text(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_text(other))),
        }
    }
    Ok(pairs)
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode a multipart/form-data payload with a generated boundary. The
/// returned content type carries the boundary parameter.
fn encode_multipart(parts: &[FormPart]) -> Encoded {
    let boundary = format!("lamina-{}", Uuid::new_v4());
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        out.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", part.name).as_bytes(),
        );
        if let Some(ref filename) = part.filename {
            out.extend_from_slice(format!("; filename=\"{filename}\"").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        if let Some(ref content_type) = part.content_type {
            out.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&part.data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Encoded {
        payload: Payload::Bytes(Bytes::from(out)),
        content_type: Some(format!("multipart/form-data; boundary={boundary}")),
    }
}
