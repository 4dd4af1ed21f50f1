//! Text and JSON rendering of final outputs and tool listings.

use bats::{AgentConfig, FinalOutput, ToolSpec};
use serde::Serialize;

/// Answer line, then attempts and cost.
pub fn render_text(output: &FinalOutput) -> String {
    format!(
        "{}\n\nattempts: {}  cost: {:.4}",
        output.answer.trim(),
        output.attempts_used,
        output.cost_used
    )
}

/// One row of `bats tools`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRow {
    pub name: String,
    pub resource: String,
    pub cost: f64,
    pub description: String,
}

pub fn tool_rows(specs: &[ToolSpec], config: &AgentConfig) -> Vec<ToolRow> {
    specs
        .iter()
        .map(|s| ToolRow {
            name: s.name.clone(),
            resource: s.resource_name().to_string(),
            cost: config.costs.tool_cost(s.resource_name()),
            description: s.description.clone().unwrap_or_default(),
        })
        .collect()
}

pub fn render_tools_text(rows: &[ToolRow], config: &AgentConfig) -> String {
    rows.iter()
        .map(|r| {
            let budget = config
                .default_budget
                .get(&r.resource)
                .map(|n| format!(", default budget {}", n))
                .unwrap_or_default();
            format!(
                "{:<8} resource {} (cost {}{}): {}",
                r.name, r.resource, r.cost, budget, r.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
