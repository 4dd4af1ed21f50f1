//! Retrying wrapper: bounded backoff around a single completion call.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::retry::{retry_async, RetryPolicy};

/// Retries failed `invoke` calls of the inner client per `policy`.
///
/// Every `AgentError::ExecutionFailed` from the endpoint is treated as transient.
/// Callers only see the error once the policy is exhausted.
pub struct RetryingLlm<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: LlmClient> RetryingLlm<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for RetryingLlm<C> {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        retry_async(
            &self.policy,
            "llm.invoke",
            |e: &AgentError| matches!(e, AgentError::ExecutionFailed(_)),
            || self.inner.invoke(messages),
        )
        .await
    }
}
