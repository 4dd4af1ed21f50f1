//! `ToolSource` over a `ToolRegistry`.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};
use crate::tools::{Tool, ToolRegistry};

/// Tool source backed by a registry; tools can be added while the source is shared.
///
/// **Interaction**: Built by the CLI with `SearchTool` and `BrowseTool`; passed to
/// `ResearchRunner` as `Arc<dyn ToolSource>`.
#[derive(Default)]
pub struct AggregateToolSource {
    registry: RwLock<ToolRegistry>,
}

impl AggregateToolSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration before the source is shared.
    pub fn with_tool(mut self, tool: Box<dyn Tool>) -> Self {
        self.registry.get_mut().register(tool);
        self
    }

    pub async fn register(&self, tool: Box<dyn Tool>) {
        self.registry.write().await.register(tool);
    }
}

#[async_trait]
impl ToolSource for AggregateToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.registry.read().await.list())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.registry.read().await.call(name, arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{BrowseTool, SearchTool};

    #[tokio::test]
    async fn lists_registered_tools_with_resources() {
        let source = AggregateToolSource::new()
            .with_tool(Box::new(SearchTool::with_api_key("k")))
            .with_tool(Box::new(BrowseTool::new()));
        let specs = source.list_tools().await.unwrap();
        let pairs: Vec<(String, String)> = specs
            .iter()
            .map(|s| (s.name.clone(), s.resource_name().to_string()))
            .collect();
        assert_eq!(
            pairs,
            [
                ("browse".to_string(), "browse".to_string()),
                ("search".to_string(), "search".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let source = AggregateToolSource::new();
        let err = source
            .call_tool("nope", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
    }
}
