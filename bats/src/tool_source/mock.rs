//! Mock ToolSource: fixed tool list and canned results; no network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Canned replies keyed by lower-case substrings of the primary argument.
const SEARCH_FIXTURE: &[(&str, &str)] = &[
    (
        "langgraph",
        "LangGraph is a library for building stateful, multi-actor applications with LLMs. \
         Workflows are graphs of nodes that read and update a shared state, connected by \
         normal and conditional edges.",
    ),
    (
        "budget",
        "Budget-aware agents track per-tool call allowances, classify the remaining budget \
         into tiers and adapt how broadly they explore.",
    ),
];

const BROWSE_FIXTURE: &[(&str, &str)] = &[(
    "langgraph",
    "Provides detailed documentation on building graphs: define a state schema, add nodes, \
     add edges from START to END, compile, then invoke.",
)];

fn fixture_reply(table: &[(&str, &str)], key: &str, fallback: &str) -> String {
    let key = key.to_lowercase();
    table
        .iter()
        .find(|(needle, _)| key.contains(needle))
        .map(|(_, reply)| reply.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Mock tool source for tests and `--mock` runs.
///
/// - `new(tools, result)`: every known tool returns `result`.
/// - `research_example()`: `search` and `browse` with canned, argument-dependent replies.
/// - `with_result_for` / `with_failure_for`: per-tool overrides.
pub struct MockToolSource {
    tools: Vec<ToolSpec>,
    default_result: Option<String>,
    results: HashMap<String, String>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<(String, Value)>>,
    call_count: AtomicUsize,
}

impl MockToolSource {
    pub fn new(tools: Vec<ToolSpec>, result: impl Into<String>) -> Self {
        Self {
            tools,
            default_result: Some(result.into()),
            results: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// `search` (query) and `browse` (url) backed by the built-in fixture.
    pub fn research_example() -> Self {
        let tools = vec![
            ToolSpec {
                name: "search".to_string(),
                description: Some("Search the web and return result snippets.".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": { "query": { "type": "string" } },
                    "required": ["query"]
                }),
                resource: Some("search".to_string()),
            },
            ToolSpec {
                name: "browse".to_string(),
                description: Some("Fetch a web page and return its text.".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "url": { "type": "string" },
                        "goal": { "type": "string" }
                    },
                    "required": ["url"]
                }),
                resource: Some("browse".to_string()),
            },
        ];
        Self {
            default_result: None,
            ..Self::new(tools, String::new())
        }
    }

    /// Replaces the result returned for every tool without an override.
    pub fn with_call_result(mut self, result: impl Into<String>) -> Self {
        self.default_result = Some(result.into());
        self
    }

    pub fn with_result_for(mut self, tool: impl Into<String>, result: impl Into<String>) -> Self {
        self.results.insert(tool.into(), result.into());
        self
    }

    /// Calls to `tool` fail with a (transient) transport error.
    pub fn with_failure_for(mut self, tool: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(tool.into(), message.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every call so far as (tool name, arguments).
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn fixture(&self, name: &str, arguments: &Value) -> String {
        let arg = |k: &str| arguments.get(k).and_then(|v| v.as_str()).unwrap_or("");
        match name {
            "search" => format!(
                "Search Tool Output: {}",
                fixture_reply(SEARCH_FIXTURE, arg("query"), "No specific information found.")
            ),
            "browse" => format!(
                "Browse Tool Output: {}",
                fixture_reply(BROWSE_FIXTURE, arg("url"), "Could not retrieve relevant content.")
            ),
            _ => String::new(),
        }
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), arguments.clone()));
        }
        if !self.tools.iter().any(|t| t.name == name) {
            return Err(ToolSourceError::NotFound(name.to_string()));
        }
        if let Some(msg) = self.failures.get(name) {
            return Err(ToolSourceError::Transport(msg.clone()));
        }
        let text = match (self.results.get(name), &self.default_result) {
            (Some(r), _) => r.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => self.fixture(name, &arguments),
        };
        Ok(ToolCallContent { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn research_example_lists_search_and_browse() {
        let source = MockToolSource::research_example();
        let tools = source.list_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["search", "browse"]);
        assert_eq!(tools[1].resource_name(), "browse");
    }

    #[tokio::test]
    async fn fixture_replies_depend_on_arguments() {
        let source = MockToolSource::research_example();
        let hit = source
            .call_tool("search", json!({"query": "Explain LangGraph workflow"}))
            .await
            .unwrap();
        assert!(hit.text.starts_with("Search Tool Output: LangGraph is a library"));
        let miss = source
            .call_tool("search", json!({"query": "weather"}))
            .await
            .unwrap();
        assert_eq!(miss.text, "Search Tool Output: No specific information found.");
        let page = source
            .call_tool("browse", json!({"url": "https://langgraph.readthedocs.io"}))
            .await
            .unwrap();
        assert!(page.text.contains("detailed documentation"));
        assert_eq!(source.call_count(), 3);
    }

    #[tokio::test]
    async fn overrides_and_failures() {
        let source = MockToolSource::research_example()
            .with_result_for("search", "custom")
            .with_failure_for("browse", "connection reset");
        assert_eq!(
            source.call_tool("search", json!({})).await.unwrap().text,
            "custom"
        );
        let err = source.call_tool("browse", json!({})).await.unwrap_err();
        assert!(err.is_transient());
        let err = source.call_tool("weather", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::NotFound(_)));
        assert_eq!(source.calls().len(), 3);
    }

    #[tokio::test]
    async fn new_returns_fixed_result_for_every_tool() {
        let source = MockToolSource::new(
            vec![ToolSpec {
                name: "lookup".into(),
                description: None,
                input_schema: json!({}),
                resource: None,
            }],
            "[]",
        );
        assert_eq!(source.call_tool("lookup", json!({})).await.unwrap().text, "[]");
    }
}
