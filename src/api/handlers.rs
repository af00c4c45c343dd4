//! HTTP request handlers

use super::types::PingResponse;
use super::AppState;
use crate::error::IntakeError;
use crate::orchestrator::OrchestratorResponse;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Orchestrator entrypoint, under both the runtime and the API name
        .route("/invocations", post(invoke))
        .route("/api/chat", post(invoke))
        // Liveness
        .route("/ping", get(ping))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Orchestration
// ============================================================

async fn invoke(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("intake_request", %request_id);

    async move {
        let response = match parse_body(&body) {
            Ok(value) => state.orchestrator.handle_value(value).await,
            Err(err) => {
                tracing::warn!(error_code = %err.code(), error = %err, "Rejected unreadable body");
                OrchestratorResponse::failure(&err)
            }
        };
        respond(response)
    }
    .instrument(span)
    .await
}

/// Decode the raw body. An empty body is an empty request.
fn parse_body(body: &[u8]) -> Result<Value, IntakeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| IntakeError::Validation(format!("Body is not JSON: {e}")))
}

fn respond(response: OrchestratorResponse) -> Response {
    let status =
        StatusCode::from_u16(response.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

// ============================================================
// Service info
// ============================================================

async fn ping() -> Json<PingResponse> {
    Json(PingResponse::healthy())
}

async fn get_version() -> &'static str {
    concat!("intake-gateway ", env!("CARGO_PKG_VERSION"))
}
