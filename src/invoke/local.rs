//! In-process transport
//!
//! Runs a [`TransitionPolicy`] as though it were the remote service, so the
//! orchestrator and adapter behave identically in single-process deployments.

use super::payload::{RawPayload, RemoteReply};
use super::{InvokeError, TransitionTransport};
use crate::policy::{TransitionPolicy, TransitionRequest};
use async_trait::async_trait;

pub struct LocalTransport<P> {
    policy: P,
}

impl<P: TransitionPolicy> LocalTransport<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl<P: TransitionPolicy> TransitionTransport for LocalTransport<P> {
    async fn send(&self, request: &TransitionRequest) -> Result<RemoteReply, InvokeError> {
        let result = self
            .policy
            .transition(&request.current_stage, &request.message);
        let value = serde_json::to_value(&result)
            .map_err(|e| InvokeError::contract(format!("Failed to encode transition result: {e}")))?;

        Ok(RemoteReply::new(Some(200)).with_field("payload", RawPayload::Structured(value)))
    }

    fn target(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoke::{InvocationAdapter, Invoker, PayloadEncoding};
    use crate::policy::LinearPolicy;
    use crate::session_key::normalize;

    #[tokio::test]
    async fn test_local_policy_through_adapter() {
        let adapter = InvocationAdapter::new(LocalTransport::new(LinearPolicy));

        let invocation = adapter
            .invoke(&normalize("s"), "LOAN_INFO", "rates?")
            .await
            .unwrap();

        assert_eq!(invocation.result.next_stage, "LOAN_OPTIONS");
        assert_eq!(
            invocation.result.assistant_message,
            "Moved from LOAN_INFO to LOAN_OPTIONS"
        );
        assert_eq!(invocation.result.updated_state["lastUserMessage"], "rates?");
        assert_eq!(invocation.meta.field, "payload");
        assert_eq!(invocation.meta.encoding, PayloadEncoding::Structured);
    }
}
