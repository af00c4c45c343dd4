//! HTTP transport for a remotely deployed transition service

use super::payload::{RawPayload, RemoteReply};
use super::{InvokeError, TransitionTransport};
use crate::policy::TransitionRequest;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Header carrying the backend session key
pub const SESSION_KEY_HEADER: &str = "x-intake-session-key";

/// Transition service reached over HTTP.
///
/// The `reqwest` client is built on first use and shared by every request
/// afterwards.
pub struct HttpTransport {
    endpoint: String,
    qualifier: String,
    timeout: Duration,
    client: OnceCell<Client>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, qualifier: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            qualifier: qualifier.into(),
            timeout,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client, InvokeError> {
        self.client
            .get_or_try_init(|| async {
                Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| InvokeError::configuration(format!("Failed to create HTTP client: {e}")))
            })
            .await
    }
}

#[async_trait]
impl TransitionTransport for HttpTransport {
    async fn send(&self, request: &TransitionRequest) -> Result<RemoteReply, InvokeError> {
        if self.endpoint.trim().is_empty() {
            return Err(InvokeError::configuration(
                "Transition endpoint is not configured",
            ));
        }

        let response = self
            .client()
            .await?
            .post(&self.endpoint)
            .query(&[("qualifier", self.qualifier.as_str())])
            .header(SESSION_KEY_HEADER, request.session_id.as_str())
            .header("accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));

        if !is_json {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()).map_err(std::io::Error::other))
                .boxed();
            return Ok(RemoteReply::new(Some(status)).with_field("body", RawPayload::Stream(stream)));
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            // A status was received; the adapter reports it with a synthesized body
            Err(e) if status >= 400 => {
                tracing::warn!(status, error = %e, "Failed to read error response body");
                return Ok(RemoteReply::new(Some(status)));
            }
            Err(e) => return Err(InvokeError::transport(format!("Failed to read response: {e}"))),
        };

        Ok(match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => reply_from_object(status, map).with_raw(bytes.to_vec()),
            Ok(other) => RemoteReply::new(Some(status)).with_field("body", RawPayload::Structured(other)),
            Err(_) => RemoteReply::new(Some(status)).with_field("body", RawPayload::Bytes(bytes.to_vec())),
        })
    }

    fn target(&self) -> &str {
        &self.endpoint
    }
}

fn classify_send_error(e: reqwest::Error) -> InvokeError {
    if e.is_timeout() {
        InvokeError::timeout(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        InvokeError::connect(format!("Connection failed: {e}"))
    } else {
        InvokeError::transport(format!("Request failed: {e}"))
    }
}

/// Expose the top-level fields of a JSON reply.
///
/// An embedded numeric `statusCode` (API-gateway envelope) is the declared
/// status unless the HTTP status is already an error. A string `body` flagged
/// with `isBase64Encoded` is decoded to raw bytes.
fn reply_from_object(http_status: u16, map: Map<String, Value>) -> RemoteReply {
    let embedded_status = map
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok());
    let status = match embedded_status {
        Some(s) if http_status < 400 => s,
        _ => http_status,
    };
    let base64_body = map
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut reply = RemoteReply::new(Some(status));
    for (name, value) in map {
        let payload = match value {
            Value::String(s) if base64_body && name == "body" => {
                match base64::engine::general_purpose::STANDARD.decode(s.as_bytes()) {
                    Ok(bytes) => RawPayload::Bytes(bytes),
                    Err(_) => RawPayload::Text(s),
                }
            }
            Value::String(s) => RawPayload::Text(s),
            other => RawPayload::Structured(other),
        };
        reply = reply.with_field(name, payload);
    }
    reply
}
