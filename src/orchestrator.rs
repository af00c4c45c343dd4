//! Session orchestrator
//!
//! load state -> invoke transition -> persist new state -> respond.
//!
//! There is no lock or conditional write around that sequence. Two concurrent
//! requests for the same session can interleave and the later write wins;
//! a session is assumed to be driven by one client at a time.

use crate::error::{ErrorCode, IntakeError};
use crate::invoke::Invoker;
use crate::policy::{TransitionResult, INITIAL_STAGE, STAGES};
use crate::session_key::{self, SessionKey};
use crate::store::{SessionStore, StoreError, LAST_MESSAGE_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound chat request, as decoded by the gateway
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub warmup: Option<bool>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Accepted but unused; reserved for de-duplication
    #[serde(default)]
    pub client_message_id: Option<String>,
}

/// Liveness acknowledgment for warmup requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmedResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub ok: bool,
    /// Client-facing session id, never the backend key
    pub session_id: String,
    pub next_stage: String,
    pub assistant_message: String,
    pub ui_hints: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureResponse {
    pub ok: bool,
    pub error: ErrorCode,
    pub detail: String,
    /// Status declared by the transition service, when it sent one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Result of one orchestrated request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrchestratorResponse {
    Warmed(WarmedResponse),
    Success(SuccessResponse),
    Failure(FailureResponse),
}

impl OrchestratorResponse {
    pub fn warmed() -> Self {
        Self::Warmed(WarmedResponse {
            ok: true,
            message: "warmed".to_string(),
        })
    }

    pub fn failure(err: &IntakeError) -> Self {
        Self::Failure(FailureResponse {
            ok: false,
            error: err.code(),
            detail: err.detail(),
            status: err.remote_status(),
        })
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }

    /// HTTP status for serving this response
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Failure(f) => f.error.http_status(),
            Self::Warmed(_) | Self::Success(_) => 200,
        }
    }
}

/// Composes store, invoker and normalizer into one request handler.
///
/// Only known stages are ever read into a request or persisted: anything
/// else, stored or returned by the transition service, becomes the initial
/// stage.
pub struct Orchestrator<S, I> {
    store: S,
    invoker: I,
    /// Known stages; the first is the initial stage
    stages: Vec<String>,
}

impl<S: SessionStore, I: Invoker> Orchestrator<S, I> {
    pub fn new(store: S, invoker: I) -> Self {
        Self {
            store,
            invoker,
            stages: STAGES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Replace the known stage set. An empty set is ignored.
    #[must_use]
    pub fn with_stages<T: Into<String>>(mut self, stages: impl IntoIterator<Item = T>) -> Self {
        let stages: Vec<String> = stages.into_iter().map(Into::into).collect();
        if !stages.is_empty() {
            self.stages = stages;
        }
        self
    }

    fn initial_stage(&self) -> &str {
        self.stages.first().map_or(INITIAL_STAGE, String::as_str)
    }

    fn is_known(&self, stage: &str) -> bool {
        self.stages.iter().any(|s| s == stage)
    }

    /// Validate an undecoded request body, then handle it.
    pub async fn handle_value(&self, body: Value) -> OrchestratorResponse {
        match serde_json::from_value::<ChatRequest>(body) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                let err = IntakeError::Validation(e.to_string());
                tracing::warn!(error_code = %err.code(), error = %err, "Rejected malformed request");
                OrchestratorResponse::failure(&err)
            }
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> OrchestratorResponse {
        if request.warmup.unwrap_or(false) {
            return OrchestratorResponse::warmed();
        }

        let session_id = session_key::resolve_session_id(request.session_id.as_deref());
        let key = session_key::normalize(&session_id);
        let message = request.msg.unwrap_or_default();

        match self.advance(&key, &message).await {
            Ok(result) => OrchestratorResponse::Success(SuccessResponse {
                ok: true,
                session_id,
                next_stage: result.next_stage,
                assistant_message: result.assistant_message,
                ui_hints: result.ui_hints,
            }),
            Err(err) => {
                tracing::warn!(
                    session_key = %key.short(),
                    error_code = %err.code(),
                    error = %err,
                    "Intake request failed"
                );
                OrchestratorResponse::failure(&err)
            }
        }
    }

    async fn advance(&self, key: &SessionKey, message: &str) -> Result<TransitionResult, IntakeError> {
        let current_stage = self.load_stage(key).await?;

        let invocation = self.invoker.invoke(key, &current_stage, message).await?;
        let mut result = invocation.result;
        if !self.is_known(&result.next_stage) {
            tracing::warn!(
                session_key = %key.short(),
                stage = %current_stage,
                next_stage = %result.next_stage,
                "Transition returned an unknown stage; resetting"
            );
            result.next_stage = self.initial_stage().to_string();
        }

        let mut extra = result.updated_state.clone();
        extra.insert(LAST_MESSAGE_FIELD.to_string(), message.to_string());

        if let Err(e) = self.store.put(key, &result.next_stage, &extra).await {
            tracing::error!(
                session_key = %key.short(),
                stage = %current_stage,
                next_stage = %result.next_stage,
                error = %e,
                "Transition succeeded but state write failed; stage not advanced"
            );
            return Err(e.into());
        }

        tracing::info!(
            session_key = %key.short(),
            stage = %current_stage,
            next_stage = %result.next_stage,
            "Session advanced"
        );
        Ok(result)
    }

    /// Current stage, with absent state (or a not-found read) meaning the
    /// initial stage. Any other store fault is surfaced.
    async fn load_stage(&self, key: &SessionKey) -> Result<String, IntakeError> {
        match self.store.get(key).await {
            Ok(Some(session)) if self.is_known(&session.stage) => Ok(session.stage),
            Ok(Some(session)) => {
                tracing::warn!(
                    session_key = %key.short(),
                    stage = %session.stage,
                    "Stored stage is unknown; using the initial stage"
                );
                Ok(self.initial_stage().to_string())
            }
            Ok(None) | Err(StoreError::NotFound(_)) => Ok(self.initial_stage().to_string()),
            Err(e) => Err(e.into()),
        }
    }
}
