//! Backend session keys
//!
//! Raw client session tokens stop at the orchestrator. Storage and the
//! transition service only ever see the SHA-256 digest of the token, which is
//! stable across restarts and always 64 hex characters long.

use sha2::{Digest, Sha256};
use std::fmt;

/// Placeholder identifier for requests that carry no session token.
///
/// Single-tenant demo behaviour: every anonymous client shares this session.
pub const DEMO_SESSION: &str = "demo-session";

/// Length of a hex-encoded backend key
pub const KEY_LEN: usize = 64;

/// Number of key characters included in log lines
const LOG_PREFIX_LEN: usize = 12;

/// Normalized, fixed-length session key used downstream of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        self.0.get(..LOG_PREFIX_LEN).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a client session token to its backend key.
///
/// Empty tokens are replaced by [`DEMO_SESSION`] before hashing so that an
/// empty string never reaches storage unnormalized.
pub fn normalize(raw: &str) -> SessionKey {
    let token = if raw.is_empty() { DEMO_SESSION } else { raw };
    let digest = Sha256::digest(token.as_bytes());
    SessionKey(format!("{digest:x}"))
}

/// Resolve the client-facing session id, falling back to [`DEMO_SESSION`].
pub fn resolve_session_id(session_id: Option<&str>) -> String {
    session_id
        .filter(|id| !id.is_empty())
        .unwrap_or(DEMO_SESSION)
        .to_string()
}
