//! Invocation error types

use thiserror::Error;

/// Invocation failure with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvokeError {
    pub kind: InvokeErrorKind,
    pub message: String,
    /// Status declared by the remote service, if one was received
    pub status: Option<u16>,
}

impl InvokeError {
    pub fn new(kind: InvokeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Configuration, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Contract, message)
    }

    /// Remote service answered with an error status. `body` is the decoded
    /// (or synthesized) response body and becomes the error message.
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: InvokeErrorKind::RemoteDeclared,
            message: body.into(),
            status: Some(status),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Connect, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(InvokeErrorKind::Transport, message)
    }
}

/// Error classification for retry and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeErrorKind {
    /// Endpoint missing or client could not be built - never retried
    Configuration,
    /// Reply had no recognized payload or an unparseable one
    Contract,
    /// Remote declared a status >= 400
    RemoteDeclared,
    /// Request timed out - retryable
    Timeout,
    /// Connection could not be established - retryable
    Connect,
    /// Any other client-level failure (including permission denial)
    Transport,
}

impl InvokeErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Timeout | Self::Connect)
    }
}
