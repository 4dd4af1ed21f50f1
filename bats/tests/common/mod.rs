//! Shared helpers for the research loop integration tests: reply builders and a
//! runner wired to separate planner / verifier / finalizer mocks.

#![allow(dead_code)]

use std::sync::Arc;

use bats::{AgentConfig, MockLlm, MockToolSource, ResearchRunner};

/// `<tool_code>` block for one call.
pub fn tool_code(name: &str, args: &[(&str, &str)]) -> String {
    let arguments: serde_json::Map<String, serde_json::Value> = args
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    format!(
        "<tool_code>{}</tool_code>",
        serde_json::json!({ "name": name, "arguments": arguments })
    )
}

/// Planner reply that searches for `query`.
pub fn search(query: &str) -> String {
    format!("<think>look it up</think>{}", tool_code("search", &[("query", query)]))
}

/// Verifier JSON with no constraint list.
pub fn verdict(decision: &str, justification: &str, summary: &str) -> String {
    serde_json::json!({
        "decision": decision,
        "justification": justification,
        "trajectory_summary": summary,
    })
    .to_string()
}

/// The three mocks of one runner, kept for call-count assertions.
pub struct Mocks {
    pub planner: Arc<MockLlm>,
    pub verifier: Arc<MockLlm>,
    pub finalizer: Arc<MockLlm>,
    pub tools: Arc<MockToolSource>,
}

impl Mocks {
    pub fn new(planner: MockLlm, verifier: MockLlm, finalizer: MockLlm) -> Self {
        Self {
            planner: Arc::new(planner),
            verifier: Arc::new(verifier),
            finalizer: Arc::new(finalizer),
            tools: Arc::new(MockToolSource::research_example()),
        }
    }

    pub fn with_tools(mut self, tools: MockToolSource) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn runner(&self, config: AgentConfig) -> ResearchRunner {
        ResearchRunner::builder(self.planner.clone(), self.tools.clone(), config)
            .verifier_llm(self.verifier.clone())
            .finalizer_llm(self.finalizer.clone())
            .build()
            .expect("research graph compiles")
    }
}

/// Default config with retries off so failing mocks do not sleep.
pub fn config() -> AgentConfig {
    AgentConfig::default().without_retries()
}
