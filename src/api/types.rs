//! API request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Liveness probe response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    pub status: String,
}

impl PingResponse {
    pub fn healthy() -> Self {
        Self {
            status: "Healthy".to_string(),
        }
    }
}

/// Body accepted by the stage handler's `/transition` route.
///
/// Every field is optional; the gateway always sends all of them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Forwarded by the gateway; the linear policy ignores it
    #[serde(default)]
    pub nlu: Option<Value>,
}

/// API-gateway style reply envelope; `body` holds JSON text
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageEnvelope {
    pub status_code: u16,
    pub body: String,
}
