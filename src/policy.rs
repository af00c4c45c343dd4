//! Stage transition policy
//!
//! The authoritative "one step forward" decision for an intake session. The
//! orchestrator never calls a policy directly: it always goes through the
//! invocation adapter, so a deployment can swap the linear demo policy for a
//! remote decision engine without touching either side.

#[cfg(test)]
mod proptests;

use crate::session_key::SessionKey;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Ordered intake stages
pub const STAGES: [&str; 4] = ["ENQUIRY", "LOAN_INFO", "LOAN_OPTIONS", "APPLICATION_START"];

/// Stage assumed for sessions with no stored state
pub const INITIAL_STAGE: &str = STAGES[0];

/// Request sent to the transition service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub session_id: String,
    pub current_stage: String,
    pub message: String,
    /// Reserved for language-understanding annotations; always an object
    #[serde(default)]
    pub nlu: Value,
}

impl TransitionRequest {
    pub fn new(key: &SessionKey, current_stage: &str, message: &str) -> Self {
        Self {
            session_id: key.as_str().to_string(),
            current_stage: current_stage.to_string(),
            message: message.to_string(),
            nlu: json!({}),
        }
    }
}

/// Decision returned by the transition service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResult {
    pub next_stage: String,
    pub assistant_message: String,
    /// Extra string fields to persist alongside the stage
    #[serde(default)]
    pub updated_state: BTreeMap<String, String>,
    #[serde(default)]
    pub ui_hints: Value,
}

/// Capability computing the next stage of a session.
pub trait TransitionPolicy: Send + Sync {
    /// Compute the next stage. Must be total: unknown stages are a recovery
    /// case, not an error.
    fn transition(&self, current_stage: &str, message: &str) -> TransitionResult;

    fn initial_stage(&self) -> &str;
}

/// Linear four-stage demo policy.
///
/// Known stages advance by one and clamp at `APPLICATION_START`; anything
/// else resets to `ENQUIRY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPolicy;

impl LinearPolicy {
    fn next_stage(current_stage: &str) -> &'static str {
        match STAGES.iter().position(|s| *s == current_stage) {
            Some(i) => STAGES[(i + 1).min(STAGES.len() - 1)],
            None => INITIAL_STAGE,
        }
    }
}

impl TransitionPolicy for LinearPolicy {
    fn transition(&self, current_stage: &str, message: &str) -> TransitionResult {
        let next_stage = Self::next_stage(current_stage);

        let mut updated_state = BTreeMap::new();
        updated_state.insert("lastUserMessage".to_string(), message.to_string());

        TransitionResult {
            next_stage: next_stage.to_string(),
            assistant_message: format!("Moved from {current_stage} to {next_stage}"),
            updated_state,
            ui_hints: json!({
                "buttons": ["Continue"],
                "form": null,
            }),
        }
    }

    fn initial_stage(&self) -> &str {
        INITIAL_STAGE
    }
}
