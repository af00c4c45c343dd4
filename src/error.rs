//! Error taxonomy at the orchestrator boundary

use crate::invoke::{InvokeError, InvokeErrorKind};
use crate::store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Every failure an intake request can end in
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Transition service contract violated: {0}")]
    AdapterContract(String),
    #[error("Transition service returned status {status}")]
    RemoteDeclared { status: u16, body: String },
    #[error("Transition service unreachable: {0}")]
    Transport(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntakeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigurationError,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::AdapterContract(_) => ErrorCode::AdapterContractError,
            Self::RemoteDeclared { .. } => ErrorCode::RemoteError,
            Self::Transport(_) => ErrorCode::TransportError,
            Self::Store(_) => ErrorCode::StoreError,
        }
    }

    /// Human-readable detail; declared remote errors pass the body through
    pub fn detail(&self) -> String {
        match self {
            Self::RemoteDeclared { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Status declared by the remote service, if any
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            Self::RemoteDeclared { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<InvokeError> for IntakeError {
    fn from(e: InvokeError) -> Self {
        match e.kind {
            InvokeErrorKind::Configuration => Self::Configuration(e.message),
            InvokeErrorKind::Contract => Self::AdapterContract(e.message),
            InvokeErrorKind::RemoteDeclared => Self::RemoteDeclared {
                status: e.status.unwrap_or(502),
                body: e.message,
            },
            InvokeErrorKind::Timeout | InvokeErrorKind::Connect | InvokeErrorKind::Transport => {
                Self::Transport(e.message)
            }
        }
    }
}

/// Machine-readable failure code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigurationError,
    ValidationError,
    AdapterContractError,
    RemoteError,
    TransportError,
    StoreError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::ValidationError => "validation_error",
            Self::AdapterContractError => "adapter_contract_error",
            Self::RemoteError => "remote_error",
            Self::TransportError => "transport_error",
            Self::StoreError => "store_error",
        }
    }

    /// HTTP status used when the failure is served over HTTP
    pub fn http_status(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::StoreError => 500,
            Self::AdapterContractError | Self::RemoteError | Self::TransportError => 502,
            Self::ConfigurationError => 503,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
