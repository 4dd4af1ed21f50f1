//! Tool source abstraction: list tools and call a tool.
//!
//! The tool invoker (`ActNode`) depends on `ToolSource` instead of a concrete
//! registry. Implementations: `AggregateToolSource` (registry of `Tool`s such as
//! `SearchTool` and `BrowseTool`) and `MockToolSource` (tests, offline runs).

mod mock;

pub use mock::MockToolSource;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool description exposed to the planner.
///
/// `resource` names the budget resource one call consumes; `None` means the
/// tool's own name.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl ToolSpec {
    /// Budget resource charged for one call.
    pub fn resource_name(&self) -> &str {
        self.resource.as_deref().unwrap_or(&self.name)
    }

    /// One-line description for prompts: `name (resource): description; args: a, b`.
    pub fn prompt_line(&self) -> String {
        let args: Vec<&str> = self
            .input_schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        format!(
            "- {} (budget: {}): {}; args: {}",
            self.name,
            self.resource_name(),
            self.description.as_deref().unwrap_or(""),
            if args.is_empty() {
                "none".to_string()
            } else {
                args.join(", ")
            }
        )
    }
}

/// Text result of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ToolSourceError {
    /// Only transport failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ToolSourceError::Transport(_))
    }
}

/// Lists and calls tools.
///
/// **Interaction**: Held as `Arc<dyn ToolSource>` by `ActNode` (calls) and
/// `ThinkNode` (tool list in the prompt).
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<ToolCallContent, ToolSourceError>;
}
