//! Minimal message types for prompts sent to the reasoning endpoint.
//!
//! Message roles: System (usually first in the list), User, Assistant.
//! Built by the planner, verifier and finalizer from their prompt templates.

/// A single chat message.
///
/// **Interaction**: Passed as a slice to `LlmClient::invoke`; mapped to the
/// chat-completions request format by `ChatOpenAI`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Message {
    /// System prompt (instructions for the model).
    System(String),
    /// User turn.
    User(String),
    /// Assistant turn.
    Assistant(String),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant(content.into())
    }

    /// Text content regardless of role.
    pub fn content(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }
}
