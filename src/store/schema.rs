//! Session state schema and record type

use crate::policy::INITIAL_STAGE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS session_state (
    namespace TEXT NOT NULL,
    pk TEXT NOT NULL,
    sk TEXT NOT NULL,
    stage TEXT NOT NULL,
    extra TEXT NOT NULL DEFAULT '{}',
    env TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    PRIMARY KEY (namespace, pk, sk)
);

CREATE INDEX IF NOT EXISTS idx_session_state_updated ON session_state(namespace, updated_at DESC);
";

/// Sort key of the per-session state record
pub const STATE_SORT_KEY: &str = "STATE";

/// Extra field holding the last user message
pub const LAST_MESSAGE_FIELD: &str = "lastMessage";

/// Partition key for a backend session key
pub fn partition_key(key: &str) -> String {
    format!("SESSION#{key}")
}

/// Stored session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Backend session key (never the raw client token)
    pub key: String,
    pub stage: String,
    pub extra: BTreeMap<String, String>,
    pub updated_at: DateTime<Utc>,
    pub environment: String,
}

impl Session {
    pub fn last_message(&self) -> Option<&str> {
        self.extra.get(LAST_MESSAGE_FIELD).map(String::as_str)
    }

    /// Stage with the empty value mapped to the initial stage
    pub(crate) fn stage_or_initial(stage: String) -> String {
        if stage.trim().is_empty() {
            INITIAL_STAGE.to_string()
        } else {
            stage
        }
    }
}
