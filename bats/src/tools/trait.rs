//! Tool trait: one callable capability with a spec.

use async_trait::async_trait;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};

/// A single tool, registered by name in a `ToolRegistry`.
///
/// **Interaction**: `spec()` feeds `ToolSource::list_tools`; `call()` backs
/// `ToolSource::call_tool` in `AggregateToolSource`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. `"search"`).
    fn name(&self) -> &str;

    /// Name, description, argument schema and budget resource.
    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError>;
}
