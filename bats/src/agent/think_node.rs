//! Planner node: decides the next action from the question, plan, budget and last step.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::budget::BudgetTier;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::state::{NextAction, SessionState};
use crate::tool_source::ToolSource;
use crate::tools::truncate_text;

use super::config::AgentConfig;
use super::parse::{decode_planner, is_sentinel, PlannerDecision};
use super::route::NODE_THINK;
use super::LOG_PREVIEW_CHARS;

/// Planner / reasoner.
///
/// Writes only `plan`, `next_action`, `pending_tool_calls`, `current_answer` and
/// appends exactly one `trajectory` entry per run. Fails closed: an LLM error or
/// an undecodable reply yields `stop`.
pub struct ThinkNode {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    config: Arc<AgentConfig>,
}

impl ThinkNode {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolSource>, config: Arc<AgentConfig>) -> Self {
        Self { llm, tools, config }
    }

    async fn tool_lines(&self) -> String {
        match self.tools.list_tools().await {
            Ok(specs) if !specs.is_empty() => specs
                .iter()
                .map(|s| s.prompt_line())
                .collect::<Vec<_>>()
                .join("\n"),
            Ok(_) => "(no tools available)".to_string(),
            Err(e) => {
                warn!(error = %e, "listing tools failed");
                "(tool list unavailable)".to_string()
            }
        }
    }

    fn stop(state: &mut SessionState, entry: String) {
        state.trajectory.push(entry);
        state.pending_tool_calls.clear();
        state.next_action = Some(NextAction::Stop);
    }
}

#[async_trait]
impl Node<SessionState> for ThinkNode {
    fn id(&self) -> &str {
        NODE_THINK
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        let mut state = state;
        let cfg = &self.config;
        let tier = state.tier(&cfg.thresholds);
        state.pending_tool_calls.clear();

        if state.budget.all_exhausted() && !state.has_ok_result() {
            let entry = format!(
                "Think [{}]: no tool budget left ({}) and no evidence gathered; stopping.",
                tier,
                state.budget.status_line()
            );
            Self::stop(&mut state, entry);
            return Ok((state, Next::Continue));
        }

        let tools = self.tool_lines().await;
        let plan = state.plan.to_string();
        let budget_status = state.budget.status_line();
        let tier_name = tier.to_string();
        let attempt = (state.attempts + 1).to_string();
        let max_attempts = state.max_attempts.to_string();
        let last_trajectory = state.last_trajectory_entry().unwrap_or("None").to_string();
        let last_tool_result = state
            .last_tool_result()
            .map(|r| format!("[{}] {}: {}", r.status, r.tool, r.output))
            .unwrap_or_else(|| "None".to_string());
        let messages = cfg.prompts.think.render(&[
            ("question", state.question.as_str()),
            ("plan", plan.as_str()),
            ("budget_status", budget_status.as_str()),
            ("tier", tier_name.as_str()),
            ("guidance", tier.guidance()),
            ("tools", tools.as_str()),
            ("attempt", attempt.as_str()),
            ("max_attempts", max_attempts.as_str()),
            ("last_trajectory", last_trajectory.as_str()),
            ("last_tool_result", last_tool_result.as_str()),
        ]);

        let reply = match self.llm.invoke(&messages).await {
            Ok(r) => r,
            Err(e) => {
                warn!(session_id = %state.session_id, error = %e, "planner call failed; stopping");
                Self::stop(&mut state, format!("Think [{}]: reasoning call failed ({}); stopping.", tier, e));
                return Ok((state, Next::Continue));
            }
        };
        if let Some(usage) = &reply.usage {
            state.record_usage(usage, cfg.costs.llm_cost_per_1k_tokens);
        }
        debug!(
            session_id = %state.session_id,
            reply = %truncate_text(&reply.content, LOG_PREVIEW_CHARS),
            "planner reply"
        );

        let decoded = decode_planner(&reply.content);
        if let Some(update) = &decoded.plan {
            state.plan.merge_update(update);
        }
        for rejected in &decoded.rejected_calls {
            warn!(session_id = %state.session_id, call = %rejected, "dropping undecodable tool call");
        }
        let thought = if decoded.thought.is_empty() {
            "(no reasoning given)".to_string()
        } else {
            decoded.thought.clone()
        };

        let (action, detail) = match decoded.decision {
            Some(PlannerDecision::Tool(calls)) => {
                if state.last_results_all_failed(cfg.consecutive_failure_limit) {
                    (
                        NextAction::Continue,
                        "recent tool calls all failed; asking for verification instead".to_string(),
                    )
                } else {
                    let detail = calls
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    state.pending_tool_calls = calls;
                    (NextAction::Tool, detail)
                }
            }
            Some(PlannerDecision::Answer(answer)) => {
                if is_sentinel(&answer) {
                    if tier == BudgetTier::Critical {
                        (NextAction::Stop, "no answer and budget critical".to_string())
                    } else {
                        (NextAction::Continue, "no answer yet".to_string())
                    }
                } else if tier == BudgetTier::High
                    && state.plan.has_open_steps()
                    && !state.has_ok_result()
                {
                    state.current_answer = answer;
                    (
                        NextAction::Continue,
                        "answer held back: budget is high and plan steps are unexplored".to_string(),
                    )
                } else {
                    let detail = truncate_text(&answer, LOG_PREVIEW_CHARS);
                    state.current_answer = answer;
                    (NextAction::Answer, detail)
                }
            }
            Some(PlannerDecision::Continue) => (NextAction::Continue, String::new()),
            Some(PlannerDecision::Stop) => (NextAction::Stop, String::new()),
            None => {
                state.push_warning("planner reply could not be decoded; stopping");
                (NextAction::Stop, "undecodable reply".to_string())
            }
        };

        let entry = if detail.is_empty() {
            format!("Think [{}]: {} -> {}", tier, thought, action)
        } else {
            format!("Think [{}]: {} -> {} ({})", tier, thought, action, detail)
        };
        state.trajectory.push(entry);
        state.next_action = Some(action);
        debug!(session_id = %state.session_id, %action, %tier, "planner decided");
        Ok((state, Next::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetTracker;
    use crate::llm::MockLlm;
    use crate::state::ToolResultRecord;
    use crate::tool_source::MockToolSource;

    fn node(llm: MockLlm) -> (ThinkNode, Arc<MockLlm>) {
        let llm = Arc::new(llm);
        let node = ThinkNode::new(
            llm.clone(),
            Arc::new(MockToolSource::research_example()),
            Arc::new(AgentConfig::default()),
        );
        (node, llm)
    }

    fn node_with(reply: &str) -> (ThinkNode, Arc<MockLlm>) {
        node(MockLlm::with_content(reply))
    }

    fn state(search: u32, browse: u32) -> SessionState {
        SessionState::new(
            "Explain LangGraph workflow",
            BudgetTracker::from_totals([("search", search), ("browse", browse)]),
            2,
        )
    }

    #[tokio::test]
    async fn exhausted_budget_stops_without_calling_llm() {
        let (node, llm) = node(MockLlm::with_content("<answer>guess</answer>"));
        let (s, _) = node.run(state(0, 0)).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Stop));
        assert_eq!(s.trajectory.len(), 1);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn tool_call_is_queued_and_prompt_carries_budget() {
        let (node, llm) = node(MockLlm::with_content(
            "<think>start broad</think><plan>[ ] 1 Search LangGraph</plan>\
             <tool_code>{\"name\":\"search\",\"arguments\":{\"query\":\"LangGraph workflow\"}}</tool_code>",
        ));
        let (s, _) = node.run(state(3, 2)).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Tool));
        assert_eq!(s.pending_tool_calls.len(), 1);
        assert_eq!(s.plan.steps().len(), 1);
        assert!(s.trajectory[0].starts_with("Think [HIGH]: start broad -> tool"));
        let prompt = llm.prompts()[0][1].content().to_string();
        assert!(prompt.contains("search: 3/3 remaining"));
        assert!(prompt.contains("- browse (budget: browse)"));
    }

    #[tokio::test]
    async fn llm_failure_and_garbage_fail_closed() {
        let (node, _) = node(MockLlm::failing("boom"));
        let (s, _) = node.run(state(3, 2)).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Stop));
        assert_eq!(s.trajectory.len(), 1);

        let (node, _) = node_with("I think maybe?");
        let (s, _) = node.run(state(3, 2)).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Stop));
        assert_eq!(s.warnings.len(), 1);
    }

    #[tokio::test]
    async fn repeated_failures_turn_tool_into_continue() {
        let (node, _) = node_with("<tool_code>{\"name\":\"search\",\"arguments\":{\"query\":\"x\"}}</tool_code>");
        let mut s = state(3, 2);
        s.tool_results.push(ToolResultRecord::failed("search", "failed: timeout"));
        s.tool_results.push(ToolResultRecord::refused("browse", "refused"));
        let (mut s, _) = node.run(s).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Continue));
        assert!(s.pending_tool_calls.is_empty());

        // A verification (here: a pivot) starts a new streak; the call goes through.
        s.tool_results_at_last_verify = s.tool_results.len();
        let (s, _) = node.run(s).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Tool));
        assert_eq!(s.pending_tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn premature_answer_at_high_tier_is_held_back() {
        let (node, _) = node_with("<plan>[ ] 1 Search docs</plan><answer>A library</answer>");
        let (s, _) = node.run(state(3, 2)).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Continue));
        assert_eq!(s.current_answer, "A library");

        let mut evidenced = state(3, 2);
        evidenced.tool_results.push(ToolResultRecord::ok("search", "LangGraph is a library"));
        let (s, _) = node.run(evidenced).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Answer));
    }

    #[tokio::test]
    async fn sentinel_answer_at_critical_tier_stops() {
        let (node, _) = node_with("<answer>None</answer>");
        let mut s = state(10, 10);
        for _ in 0..10 {
            s.budget.charge("search").unwrap();
        }
        s.tool_results.push(ToolResultRecord::ok("search", "partial"));
        let (s, _) = node.run(s).await.unwrap();
        assert_eq!(s.next_action, Some(NextAction::Stop));
        assert!(s.current_answer.is_empty());
    }
}
