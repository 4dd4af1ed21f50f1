//! Reasoning endpoint abstraction.
//!
//! The planner, verifier and finalizer each send a short prompt and parse the
//! returned text; this module defines the client trait, an OpenAI-compatible
//! client, a scripted mock and a retrying wrapper.

mod mock;
mod openai;
mod retrying;

pub use mock::MockLlm;
pub use openai::ChatOpenAI;
pub use retrying::RetryingLlm;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::message::Message;

/// Token usage reported by the endpoint for one call.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response of one completion call.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant text.
    pub content: String,
    pub usage: Option<LlmUsage>,
}

/// Completion client: messages in, assistant text out.
///
/// **Interaction**: Held as `Arc<dyn LlmClient>` by `ThinkNode`, `VerifyNode`
/// and `FinalizeNode`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        self.as_ref().invoke(messages).await
    }
}
