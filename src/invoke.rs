//! Transition service invocation
//!
//! Calls the transition service through a [`TransitionTransport`], then turns
//! whatever came back into a [`TransitionResult`] or a classified
//! [`InvokeError`]. Retries of timeouts and connection failures live here;
//! the orchestrator never retries.

mod error;
mod http;
mod local;
pub mod payload;

pub use error::{InvokeError, InvokeErrorKind};
pub use http::HttpTransport;
pub use local::LocalTransport;
pub use payload::{PayloadEncoding, RawPayload, RemoteReply, PAYLOAD_FIELDS};

use crate::policy::{TransitionRequest, TransitionResult};
use crate::session_key::SessionKey;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_ASSISTANT_MESSAGE: &str = "OK";

/// Carrier for a transition request
#[async_trait]
pub trait TransitionTransport: Send + Sync {
    /// Send the request and return the raw reply. Only client-level failures
    /// are errors here; declared statuses travel inside the reply.
    async fn send(&self, request: &TransitionRequest) -> Result<RemoteReply, InvokeError>;

    /// Label for log lines
    fn target(&self) -> &str;
}

/// Synchronous transition invocation as seen by the orchestrator
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        key: &SessionKey,
        current_stage: &str,
        message: &str,
    ) -> Result<Invocation, InvokeError>;
}

/// Successful invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub result: TransitionResult,
    pub meta: ResponseMeta,
}

/// Raw response metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMeta {
    pub status: Option<u16>,
    pub field: &'static str,
    pub encoding: PayloadEncoding,
    pub attempts: u32,
}

/// Body reported when the remote declared an error but sent nothing usable
pub fn synthesized_error_body(status: u16) -> String {
    json!({ "error": "remote_error", "status": status }).to_string()
}

/// Adapter from a transport to the [`Invoker`] contract
pub struct InvocationAdapter<T> {
    transport: T,
    max_attempts: u32,
    backoff: Duration,
}

impl<T: TransitionTransport> InvocationAdapter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn send_with_retry(
        &self,
        request: &TransitionRequest,
    ) -> Result<(RemoteReply, u32), InvokeError> {
        let mut attempt = 1;
        loop {
            match self.transport.send(request).await {
                Ok(reply) => return Ok((reply, attempt)),
                Err(e) if e.kind.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        target_service = %self.transport.target(),
                        attempt,
                        error = %e.message,
                        "Transition call failed, retrying"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<T: TransitionTransport> Invoker for InvocationAdapter<T> {
    async fn invoke(
        &self,
        key: &SessionKey,
        current_stage: &str,
        message: &str,
    ) -> Result<Invocation, InvokeError> {
        let request = TransitionRequest::new(key, current_stage, message);
        let (reply, attempts) = self.send_with_retry(&request).await?;
        interpret(reply, current_stage, attempts).await
    }
}

/// Turn a raw reply into an invocation outcome.
///
/// A declared error status always wins. Its body is the decoded payload, or
/// the raw reply body when no recognized field exists; empty or unreadable
/// bodies are replaced by a synthesized one.
async fn interpret(
    mut reply: RemoteReply,
    current_stage: &str,
    attempts: u32,
) -> Result<Invocation, InvokeError> {
    let status = reply.status;
    let field_names = reply.field_names().join(", ");
    let raw = reply.take_raw_text();
    let decoded = payload::decode(reply).await;

    if let Some(code) = status.filter(|s| *s >= 400) {
        let text = match decoded {
            Ok(Some(found)) => Some(found.text),
            Ok(None) => raw,
            Err(e) => {
                tracing::warn!(status = code, error = %e.message, "Failed to read error body");
                None
            }
        };
        let body = text
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| synthesized_error_body(code));
        return Err(InvokeError::remote(code, body));
    }

    let decoded = decoded?.ok_or_else(|| {
        InvokeError::contract(format!(
            "Reply has no payload under any of {PAYLOAD_FIELDS:?} (fields: [{field_names}])"
        ))
    })?;

    let result = parse_result(&decoded.text, current_stage)?;
    Ok(Invocation {
        result,
        meta: ResponseMeta {
            status,
            field: decoded.field,
            encoding: decoded.encoding,
            attempts,
        },
    })
}

/// Reply body as the transition service sends it; every field is optional
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    next_stage: Option<String>,
    assistant_message: Option<String>,
    ui_hints: Option<Value>,
    updated_state: Option<Map<String, Value>>,
}

/// Parse decoded payload text, filling the defaults the service may omit.
fn parse_result(text: &str, current_stage: &str) -> Result<TransitionResult, InvokeError> {
    let wire: WireResult = serde_json::from_str(text)
        .map_err(|e| InvokeError::contract(format!("Payload is not a transition result: {e}")))?;

    let updated_state: BTreeMap<String, String> = wire
        .updated_state
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();

    Ok(TransitionResult {
        next_stage: wire
            .next_stage
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| current_stage.to_string()),
        assistant_message: wire
            .assistant_message
            .unwrap_or_else(|| DEFAULT_ASSISTANT_MESSAGE.to_string()),
        updated_state,
        ui_hints: wire.ui_hints.unwrap_or_else(|| json!({})),
    })
}

/// Logging wrapper for invokers
pub struct LoggingInvoker {
    inner: Arc<dyn Invoker>,
    target: String,
}

impl LoggingInvoker {
    pub fn new(inner: Arc<dyn Invoker>, target: impl Into<String>) -> Self {
        Self {
            inner,
            target: target.into(),
        }
    }
}

#[async_trait]
impl Invoker for LoggingInvoker {
    async fn invoke(
        &self,
        key: &SessionKey,
        current_stage: &str,
        message: &str,
    ) -> Result<Invocation, InvokeError> {
        let start = Instant::now();
        let result = self.inner.invoke(key, current_stage, message).await;
        let duration = start.elapsed();

        match &result {
            Ok(invocation) => {
                tracing::info!(
                    target_service = %self.target,
                    session_key = %key.short(),
                    stage = %current_stage,
                    next_stage = %invocation.result.next_stage,
                    field = invocation.meta.field,
                    encoding = ?invocation.meta.encoding,
                    attempts = invocation.meta.attempts,
                    duration_ms = %duration.as_millis(),
                    "Transition call completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    target_service = %self.target,
                    session_key = %key.short(),
                    stage = %current_stage,
                    kind = ?e.kind,
                    status = ?e.status,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Transition call failed"
                );
            }
        }

        result
    }
}

#[async_trait]
impl<T: Invoker + ?Sized> Invoker for Arc<T> {
    async fn invoke(
        &self,
        key: &SessionKey,
        current_stage: &str,
        message: &str,
    ) -> Result<Invocation, InvokeError> {
        (**self).invoke(key, current_stage, message).await
    }
}
