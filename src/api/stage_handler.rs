//! Stage handler service
//!
//! Serves a [`TransitionPolicy`] at `POST /transition` so the gateway can
//! reach it through its HTTP transport. Replies use the API-gateway envelope:
//! the transition result is JSON text under `body`, with `statusCode` beside
//! it.

use super::types::{PingResponse, StageEnvelope, StageRequest};
use crate::policy::TransitionPolicy;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct StageState {
    policy: Arc<dyn TransitionPolicy>,
}

impl StageState {
    pub fn new(policy: impl TransitionPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }
}

pub fn create_router(state: StageState) -> Router {
    Router::new()
        .route("/transition", post(transition))
        .route("/ping", get(ping))
        .with_state(state)
}

async fn transition(State(state): State<StageState>, body: Bytes) -> Json<StageEnvelope> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StageRequest::default()
    } else {
        match serde_json::from_slice::<StageRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed transition request");
                return Json(StageEnvelope {
                    status_code: 400,
                    body: json!({ "error": "bad_request", "detail": e.to_string() }).to_string(),
                });
            }
        }
    };

    let current_stage = request
        .current_stage
        .unwrap_or_else(|| state.policy.initial_stage().to_string());
    let message = request.message.unwrap_or_default();
    let result = state.policy.transition(&current_stage, &message);

    tracing::info!(
        session_key = request.session_id.as_deref().unwrap_or("-"),
        stage = %current_stage,
        next_stage = %result.next_stage,
        "Transition computed"
    );

    match serde_json::to_string(&result) {
        Ok(body) => Json(StageEnvelope {
            status_code: 200,
            body,
        }),
        Err(e) => Json(StageEnvelope {
            status_code: 500,
            body: json!({ "error": "encode_failed", "detail": e.to_string() }).to_string(),
        }),
    }
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse::healthy())
}
