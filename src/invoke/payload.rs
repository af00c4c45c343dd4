//! Remote reply normalization
//!
//! The transition service has answered under several field names and in
//! several encodings over time. A reply is normalized in two steps: the
//! payload is located under the first recognized field name, then an ordered
//! list of extractors turns it into text. Streamed payloads are drained into
//! bytes before the extractors run.

use super::InvokeError;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;

/// Recognized payload field names, in lookup order
pub const PAYLOAD_FIELDS: [&str; 4] = ["payload", "response", "output", "body"];

/// Chunked byte stream exposed by streaming transports
pub type ByteStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

/// A payload as the transport received it
pub enum RawPayload {
    Stream(ByteStream),
    Bytes(Vec<u8>),
    Text(String),
    Structured(Value),
}

impl fmt::Debug for RawPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Structured(v) => f.debug_tuple("Structured").field(v).finish(),
        }
    }
}

/// Encoding the payload was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Stream,
    Bytes,
    Text,
    Structured,
}

/// Raw reply from a transport: an optional declared status plus named fields
#[derive(Debug, Default)]
pub struct RemoteReply {
    pub status: Option<u16>,
    fields: Vec<(String, RawPayload)>,
    /// Whole response body as received, when the transport had it in hand
    raw: Option<Vec<u8>>,
}

impl RemoteReply {
    pub fn new(status: Option<u16>) -> Self {
        Self {
            status,
            fields: Vec::new(),
            raw: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, payload: RawPayload) -> Self {
        self.fields.push((name.into(), payload));
        self
    }

    #[must_use]
    pub fn with_raw(mut self, body: Vec<u8>) -> Self {
        self.raw = Some(body);
        self
    }

    /// Take the raw body as lossy UTF-8 text
    pub fn take_raw_text(&mut self) -> Option<String> {
        self.raw
            .take()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn take_field(&mut self, name: &str) -> Option<RawPayload> {
        let index = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.swap_remove(index).1)
    }
}

/// Normalized payload text plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub field: &'static str,
    pub encoding: PayloadEncoding,
    pub text: String,
}

/// Extraction strategy: decoded text, or `None` when not applicable
type Extractor = fn(&RawPayload) -> Option<String>;

const EXTRACTORS: [(PayloadEncoding, Extractor); 3] = [
    (PayloadEncoding::Bytes, from_bytes),
    (PayloadEncoding::Text, from_text),
    (PayloadEncoding::Structured, from_structured),
];

fn from_bytes(payload: &RawPayload) -> Option<String> {
    match payload {
        RawPayload::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

fn from_text(payload: &RawPayload) -> Option<String> {
    match payload {
        RawPayload::Text(text) => Some(text.clone()),
        _ => None,
    }
}

fn from_structured(payload: &RawPayload) -> Option<String> {
    match payload {
        RawPayload::Structured(value) => serde_json::to_string(value).ok(),
        _ => None,
    }
}

/// Read a stream to completion
async fn drain(mut stream: ByteStream) -> Result<Vec<u8>, InvokeError> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| InvokeError::transport(format!("Failed to read response stream: {e}")))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Locate and decode the payload of a reply.
///
/// Returns `Ok(None)` when no recognized field is present; the caller decides
/// whether that is a contract violation.
pub async fn decode(mut reply: RemoteReply) -> Result<Option<DecodedPayload>, InvokeError> {
    let Some((field, payload)) = PAYLOAD_FIELDS
        .iter()
        .find_map(|name| reply.take_field(name).map(|p| (*name, p)))
    else {
        return Ok(None);
    };

    let (payload, streamed) = match payload {
        RawPayload::Stream(stream) => (RawPayload::Bytes(drain(stream).await?), true),
        other => (other, false),
    };

    for (encoding, extract) in EXTRACTORS {
        if let Some(text) = extract(&payload) {
            return Ok(Some(DecodedPayload {
                field,
                encoding: if streamed { PayloadEncoding::Stream } else { encoding },
                text,
            }));
        }
    }

    Err(InvokeError::contract(format!(
        "Payload under '{field}' has no usable encoding: {payload:?}"
    )))
}
