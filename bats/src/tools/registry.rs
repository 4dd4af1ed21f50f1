//! Name → tool map.

use std::collections::BTreeMap;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::r#trait::Tool;

/// Tools by name; listing is ordered by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool; a tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolSourceError::NotFound(name.to_string()))?;
        tool.call(args).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: self.0.to_string(),
                description: None,
                input_schema: json!({}),
                resource: None,
            }
        }
        async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
            Ok(ToolCallContent {
                text: args.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn register_list_and_call() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Echo("b")));
        registry.register(Box::new(Echo("a")));
        registry.register(Box::new(Echo("a")));
        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["a", "b"]);
        let out = registry.call("a", json!({"x": 1})).await.unwrap();
        assert_eq!(out.text, r#"{"x":1}"#);
        assert!(matches!(
            registry.call("zzz", json!({})).await,
            Err(ToolSourceError::NotFound(_))
        ));
    }
}
