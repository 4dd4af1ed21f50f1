//! Loop-wide properties: budgets never overdrawn, attempts bounded, refusals
//! idempotent, compaction confined to verification, termination.

mod common;

use std::sync::Arc;

use bats::budget::BudgetTracker;
use bats::{
    ActNode, AgentConfig, MockLlm, MockToolSource, Next, Node, ResearchRequest, SessionState,
    ToolCallRecord, ToolStatus, VerificationDecision,
};
use common::{config, search, verdict, Mocks};

fn assert_within_budget(state: &SessionState) {
    for (name, budget) in state.budget.resources() {
        assert!(
            budget.used <= budget.total,
            "{} overdrawn: {}/{}",
            name,
            budget.used,
            budget.total
        );
    }
}

/// **Scenario**: a planner that keeps asking for searches after the budget is gone
/// is refused, never overdraws, and the loop still ends within `max_attempts`.
#[tokio::test]
async fn insistent_planner_never_overdraws() {
    let mocks = Mocks::new(
        MockLlm::with_content(search("Explain LangGraph workflow")),
        MockLlm::with_content(verdict("CONTINUE", "", "keep going")),
        MockLlm::with_content("<answer>x</answer>"),
    );
    let runner = mocks.runner(config());
    let request = ResearchRequest::new("Explain LangGraph workflow")
        .with_budget([("search", 2), ("browse", 0)])
        .with_max_attempts(2);

    let state = runner.invoke_with_state(request).await;

    assert_within_budget(&state);
    assert_eq!(state.budget.get("search").unwrap().used, 2);
    assert_eq!(mocks.tools.call_count(), 2);
    assert!(state
        .tool_results
        .iter()
        .any(|r| r.status == ToolStatus::Refused && r.output.contains("budget exhausted")));
    assert!(state.attempts <= state.max_attempts);
    assert!(state.final_output.is_some());
}

/// **Scenario**: invoking a tool whose resource is exhausted leaves `used` unchanged
/// and appends one refused result per call, every time.
#[tokio::test]
async fn refusal_is_idempotent() {
    let tools = Arc::new(MockToolSource::research_example());
    let act = ActNode::new(tools.clone(), Arc::new(AgentConfig::default()));
    let mut state = SessionState::new(
        "q",
        BudgetTracker::from_totals([("search", 1u32), ("browse", 0u32)]),
        2,
    );

    for round in 1..=3 {
        state.pending_tool_calls = vec![ToolCallRecord::new("browse", [("url", "https://x.org")])];
        let (next_state, next) = act.run(state).await.unwrap();
        state = next_state;
        assert_eq!(next, Next::Continue);
        assert_eq!(state.budget.get("browse").unwrap().used, 0);
        assert_eq!(state.tool_results.len(), round);
        assert_eq!(state.tool_results[round - 1].status, ToolStatus::Refused);
    }
    assert_eq!(tools.call_count(), 0);
    assert_eq!(state.cost_used, 0.0);
}

/// **Scenario**: a CONTINUE verdict replaces the trajectory with one summary entry
/// but leaves tool results alone; the later SUCCESS keeps the trajectory intact.
#[tokio::test]
async fn compaction_only_rewrites_trajectory_outside_success() {
    let mocks = Mocks::new(
        MockLlm::scripted([
            search("Explain LangGraph workflow"),
            "<continue/>".to_string(),
            "<think>enough</think><continue/>".to_string(),
        ]),
        MockLlm::scripted([
            verdict("CONTINUE", "needs confirmation", "searched once, one source"),
            r#"{"constraints":[{"constraint":"explains workflow","status":"satisfied"}],
                "decision":"SUCCESS","justification":"ok","trajectory_summary":"unused"}"#
                .to_string(),
        ]),
        MockLlm::with_content("<answer>x</answer>"),
    );
    let runner = mocks.runner(config());

    let state = runner
        .invoke_with_state(ResearchRequest::new("Explain LangGraph workflow"))
        .await;

    assert_eq!(state.verification_decision, VerificationDecision::Success);
    assert_eq!(state.tool_results.len(), 1);
    assert_eq!(state.trajectory.len(), 2);
    assert_eq!(
        state.trajectory[0],
        "Verification CONTINUE (attempt 1): searched once, one source"
    );
    assert!(state.trajectory[1].starts_with("Think ["));
}

/// **Scenario**: a verifier that always says CONTINUE and a planner that never acts
/// still terminate: stalls are forced into PIVOTs until attempts run out.
#[tokio::test]
async fn always_continue_verifier_terminates() {
    let mocks = Mocks::new(
        MockLlm::with_content("<continue/>"),
        MockLlm::with_content(verdict("CONTINUE", "", "no progress")),
        MockLlm::with_content("<answer>x</answer>"),
    );
    let runner = mocks.runner(config());
    let request = ResearchRequest::new("q").with_max_attempts(3);

    let state = runner.invoke_with_state(request).await;

    assert_eq!(state.attempts, 3);
    assert!(state.final_output.unwrap().is_none());
    assert!(!state.warnings.iter().any(|w| w.contains("recursion limit")));
    // Two stalled verifications per attempt.
    assert_eq!(mocks.verifier.call_count(), 6);
}

/// **Scenario**: with every stall guard disabled the recursion limit ends the loop
/// and the caller still gets a well-formed sentinel output.
#[tokio::test]
async fn recursion_limit_is_the_last_resort() {
    let mocks = Mocks::new(
        MockLlm::with_content("<continue/>"),
        MockLlm::with_content(verdict("CONTINUE", "", "no progress")),
        MockLlm::with_content("<answer>x</answer>"),
    );
    let runner = mocks.runner(AgentConfig {
        stall_limit: 0,
        consecutive_failure_limit: 0,
        recursion_limit: 12,
        ..config()
    });

    let state = runner.invoke_with_state(ResearchRequest::new("q")).await;

    assert!(state.final_output.as_ref().unwrap().is_none());
    assert!(state.warnings.iter().any(|w| w.contains("recursion limit")));
    assert_eq!(state.attempts, 0);
}

/// **Scenario**: sessions served together keep separate budgets and outputs.
#[tokio::test]
async fn concurrent_sessions_are_isolated() {
    let mocks = Mocks::new(
        MockLlm::scripted([
            search("Explain LangGraph workflow"),
            "<answer>LangGraph is a library</answer>".to_string(),
        ]),
        MockLlm::with_content(verdict("SUCCESS", "", "")),
        MockLlm::with_content("<answer>LangGraph is a library</answer>"),
    );
    let runner = mocks.runner(config());

    let outputs = runner
        .invoke_many(vec![
            ResearchRequest::new("no budget").with_budget([("search", 0), ("browse", 0)]),
            ResearchRequest::new("also no budget").with_budget([("search", 0)]),
        ])
        .await;

    assert_eq!(outputs.len(), 2);
    assert!(outputs.iter().all(|o| o.is_none() && o.cost_used == 0.0));
    assert_eq!(mocks.planner.call_count(), 0);
}
