//! End-to-end scenarios for the research loop: zero budget, last unit, verified
//! answer, last attempt, concurrent partial failure.

mod common;

use bats::{
    MockLlm, MockToolSource, ResearchRequest, ToolStatus, VerificationDecision, NO_ANSWER,
};
use common::{config, search, tool_code, verdict, Mocks};

/// **Scenario**: with every budget at zero the planner stops before any model call
/// and the session ends with the sentinel.
#[tokio::test]
async fn zero_budget_stops_immediately_with_sentinel() {
    let mocks = Mocks::new(
        MockLlm::with_content(search("anything")),
        MockLlm::with_content(verdict("SUCCESS", "", "")),
        MockLlm::with_content("<answer>made up</answer>"),
    );
    let runner = mocks.runner(config());
    let request = ResearchRequest::new("Explain LangGraph workflow")
        .with_budget([("search", 0), ("browse", 0)]);

    let state = runner.invoke_with_state(request).await;

    let output = state.final_output.clone().unwrap();
    assert_eq!(output.answer, NO_ANSWER);
    assert!(output.is_none());
    assert_eq!(output.attempts_used, 0);
    assert_eq!(output.cost_used, 0.0);
    assert_eq!(state.final_answers, vec![NO_ANSWER.to_string()]);
    assert_eq!(mocks.planner.call_count(), 0);
    assert_eq!(mocks.finalizer.call_count(), 0);
    assert_eq!(mocks.tools.call_count(), 0);
    assert!(state.trajectory.iter().any(|e| e.contains("stop")));
}

/// **Scenario**: a tool request with one search unit left consumes exactly that unit.
#[tokio::test]
async fn last_search_unit_is_charged_once() {
    let mocks = Mocks::new(
        MockLlm::scripted([
            search("Explain LangGraph workflow"),
            "<answer>LangGraph is a library for stateful agents.</answer>".to_string(),
        ]),
        MockLlm::with_content(verdict("SUCCESS", "", "")),
        MockLlm::with_content("<answer>LangGraph is a library for stateful agents.</answer>"),
    );
    let runner = mocks.runner(config());
    let request = ResearchRequest::new("Explain LangGraph workflow")
        .with_budget([("search", 1), ("browse", 2)]);

    let state = runner.invoke_with_state(request).await;

    let search = state.budget.get("search").unwrap();
    assert_eq!(search.used, 1);
    assert_eq!(state.budget.remaining("search"), 0);
    assert_eq!(state.budget.get("browse").unwrap().used, 0);
    assert_eq!(state.tool_results.len(), 1);
    assert_eq!(state.tool_results[0].status, ToolStatus::Ok);
    assert!((state.cost_used - 0.001).abs() < 1e-12);
    assert_eq!(
        state.final_output.unwrap().answer,
        "LangGraph is a library for stateful agents."
    );
}

/// **Scenario**: a SUCCESS verdict with a candidate answer is returned verbatim
/// without another reasoning pass.
#[tokio::test]
async fn verified_answer_is_returned_unchanged() {
    let answer = "LangGraph models an agent as a graph of nodes sharing one state.";
    let mocks = Mocks::new(
        // High tier, open plan step, no evidence yet: the answer is held for verification.
        MockLlm::with_content(format!(
            "<plan>[ ] 1 Confirm with the docs</plan><answer>{}</answer>",
            answer
        )),
        MockLlm::with_content(
            r#"{"constraints":[{"constraint":"describes LangGraph","status":"satisfied"}],
                "decision":"SUCCESS","justification":"matches","trajectory_summary":"answered"}"#,
        ),
        MockLlm::with_content("<answer>something else</answer>"),
    );
    let runner = mocks.runner(config());

    let state = runner
        .invoke_with_state(ResearchRequest::new("What is LangGraph?"))
        .await;

    assert_eq!(state.verification_decision, VerificationDecision::Success);
    assert_eq!(state.final_output.as_ref().unwrap().answer, answer);
    assert_eq!(state.final_answers, vec![answer.to_string()]);
    assert_eq!(mocks.finalizer.call_count(), 0);
    assert_eq!(mocks.verifier.call_count(), 1);
}

/// **Scenario**: PIVOT on the last attempt goes to the finalizer, not back to the planner.
#[tokio::test]
async fn pivot_on_last_attempt_finalizes() {
    let mocks = Mocks::new(
        MockLlm::with_content("<think>check progress</think><continue/>"),
        MockLlm::with_content(verdict("PIVOT", "dead end", "nothing found")),
        MockLlm::with_content("<answer>x</answer>"),
    );
    let runner = mocks.runner(config());
    let request = ResearchRequest::new("q").with_max_attempts(2);

    let state = runner.invoke_with_state(request).await;

    assert_eq!(state.attempts, 2);
    assert_eq!(mocks.planner.call_count(), 2);
    assert_eq!(mocks.verifier.call_count(), 2);
    assert_eq!(mocks.finalizer.call_count(), 0);
    let output = state.final_output.unwrap();
    assert!(output.is_none());
    assert_eq!(output.attempts_used, 2);
}

/// **Scenario**: two calls dispatched together, one failing: both outcomes are
/// recorded in request order and both units are charged.
#[tokio::test]
async fn concurrent_calls_keep_success_beside_failure() {
    let batch = format!(
        "<think>two leads</think>{}{}",
        tool_code("search", &[("query", "Explain LangGraph workflow")]),
        tool_code("browse", &[("url", "https://langgraph.readthedocs.io")]),
    );
    let mocks = Mocks::new(
        MockLlm::scripted([batch, "<stop/>".to_string()]),
        MockLlm::with_content(verdict("CONTINUE", "", "")),
        MockLlm::with_content("<answer>x</answer>"),
    )
    .with_tools(MockToolSource::research_example().with_failure_for("browse", "connection reset"));
    let runner = mocks.runner(config());

    let state = runner
        .invoke_with_state(ResearchRequest::new("Explain LangGraph workflow"))
        .await;

    let statuses: Vec<_> = state.tool_results.iter().map(|r| (r.tool.as_str(), r.status)).collect();
    assert_eq!(
        statuses,
        [("search", ToolStatus::Ok), ("browse", ToolStatus::Failed)]
    );
    assert!(state.tool_results[0].output.contains("LangGraph is a library"));
    assert!(state.tool_results[1].output.contains("connection reset"));
    assert_eq!(state.budget.get("search").unwrap().used, 1);
    assert_eq!(state.budget.get("browse").unwrap().used, 1);
    assert_eq!(mocks.tools.call_count(), 2);
    assert!(state.final_output.unwrap().is_none());
}
