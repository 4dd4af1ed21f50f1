//! Builds the research graph once and runs sessions on it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::budget::BudgetTracker;
use crate::graph::{
    CompilationError, CompiledStateGraph, LoggingNodeMiddleware, StateGraph, END, START,
};
use crate::llm::{LlmClient, RetryingLlm};
use crate::retry::RetryPolicy;
use crate::state::{FinalOutput, NextAction, ResearchRequest, SessionState};
use crate::tool_source::ToolSource;

use super::act_node::ActNode;
use super::config::AgentConfig;
use super::finalize_node::{finalize_halted, FinalizeNode};
use super::pivot::PivotStrategy;
use super::route::{
    route_after_think, route_after_verify, NODE_ACT, NODE_FINALIZE, NODE_THINK, NODE_VERIFY,
};
use super::think_node::ThinkNode;
use super::verify_node::VerifyNode;

/// Failure to set up a runner. Sessions themselves never fail.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to build research graph: {0}")]
    Graph(#[from] CompilationError),
}

fn path_map(targets: &[&str]) -> Option<HashMap<String, String>> {
    Some(
        targets
            .iter()
            .map(|t| (t.to_string(), t.to_string()))
            .collect(),
    )
}

fn with_retry(llm: Arc<dyn LlmClient>, policy: &RetryPolicy) -> Arc<dyn LlmClient> {
    if *policy == RetryPolicy::None {
        llm
    } else {
        Arc::new(RetryingLlm::new(llm, policy.clone()))
    }
}

/// Builder for [`ResearchRunner`]: separate verifier / finalizer models and a custom
/// pivot strategy are optional.
pub struct ResearchRunnerBuilder {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    config: AgentConfig,
    verifier_llm: Option<Arc<dyn LlmClient>>,
    finalizer_llm: Option<Arc<dyn LlmClient>>,
    pivot: Option<Arc<dyn PivotStrategy>>,
}

impl ResearchRunnerBuilder {
    pub fn verifier_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.verifier_llm = Some(llm);
        self
    }

    pub fn finalizer_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.finalizer_llm = Some(llm);
        self
    }

    /// Overrides the strategy selected by `AgentConfig::pivot_mode`.
    pub fn pivot_strategy(mut self, pivot: Arc<dyn PivotStrategy>) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn build(self) -> Result<ResearchRunner, RunError> {
        let config = Arc::new(self.config);
        let policy = &config.llm_retry;
        let planner = with_retry(self.llm.clone(), policy);
        let verifier = with_retry(self.verifier_llm.unwrap_or_else(|| self.llm.clone()), policy);
        let finalizer = with_retry(self.finalizer_llm.unwrap_or(self.llm), policy);

        let mut verify = VerifyNode::new(verifier, config.clone());
        if let Some(pivot) = self.pivot {
            verify = verify.with_pivot_strategy(pivot);
        }

        let mut graph = StateGraph::<SessionState>::new()
            .with_middleware(Arc::new(LoggingNodeMiddleware::default()))
            .with_recursion_limit(config.recursion_limit);
        graph
            .add_node(
                NODE_THINK,
                Arc::new(ThinkNode::new(planner, self.tools.clone(), config.clone())),
            )
            .add_node(NODE_ACT, Arc::new(ActNode::new(self.tools, config.clone())))
            .add_node(NODE_VERIFY, Arc::new(verify))
            .add_node(
                NODE_FINALIZE,
                Arc::new(FinalizeNode::new(finalizer, config.clone())),
            );
        graph.add_edge(START, NODE_THINK);
        graph.add_conditional_edges(
            NODE_THINK,
            Arc::new(|s: &SessionState| route_after_think(s).to_string()),
            path_map(&[NODE_ACT, NODE_FINALIZE, NODE_VERIFY, END]),
        );
        graph.add_edge(NODE_ACT, NODE_THINK);
        graph.add_conditional_edges(
            NODE_VERIFY,
            Arc::new(|s: &SessionState| route_after_verify(s).to_string()),
            path_map(&[NODE_THINK, NODE_FINALIZE]),
        );
        graph.add_edge(NODE_FINALIZE, END);

        Ok(ResearchRunner {
            graph: graph.compile()?,
            config,
        })
    }
}

/// Runs research sessions. One compiled graph, one fresh `SessionState` per question.
///
/// **Interaction**: built from an `LlmClient`, a `ToolSource` and an `AgentConfig`;
/// used by the CLI and integration tests.
pub struct ResearchRunner {
    graph: CompiledStateGraph<SessionState>,
    config: Arc<AgentConfig>,
}

impl ResearchRunner {
    pub fn builder(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
        config: AgentConfig,
    ) -> ResearchRunnerBuilder {
        ResearchRunnerBuilder {
            llm,
            tools,
            config,
            verifier_llm: None,
            finalizer_llm: None,
            pivot: None,
        }
    }

    /// One model for every reasoning call.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
        config: AgentConfig,
    ) -> Result<Self, RunError> {
        Self::builder(llm, tools, config).build()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Fresh state for `request`; missing budget or attempt limit take the configured defaults.
    pub fn initial_state(&self, request: &ResearchRequest) -> SessionState {
        let budget = match &request.budget {
            Some(totals) => {
                BudgetTracker::from_totals(totals.iter().map(|(k, v)| (k.clone(), v.total)))
            }
            None => self.config.default_tracker(),
        };
        SessionState::new(
            request.question.clone(),
            budget,
            request.max_attempts.unwrap_or(self.config.max_attempts),
        )
    }

    /// Runs one session and returns its final state.
    ///
    /// A session that halts without reaching the finalizer (planner stop,
    /// recursion limit) still ends with a recorded `NONE` output. Everything the
    /// session logs is inside a `session` span carrying its id.
    pub async fn invoke_with_state(&self, request: ResearchRequest) -> SessionState {
        let state = self.initial_state(&request);
        let span = info_span!("session", id = %state.session_id);
        self.run_session(state).instrument(span).await
    }

    async fn run_session(&self, state: SessionState) -> SessionState {
        info!(
            question = %state.question,
            budget = %state.budget.status_line(),
            max_attempts = state.max_attempts,
            "research session started"
        );
        let (mut state, halted_by) = match self.graph.invoke_or_last_state(state).await {
            Ok(s) => (s, None),
            Err((s, e)) => {
                warn!(error = %e, "research loop aborted");
                (s, Some(e.to_string()))
            }
        };
        if state.final_output.is_none() {
            let reason = match (&halted_by, state.next_action) {
                (Some(e), _) => e.clone(),
                (None, Some(NextAction::Stop)) => "planner stopped".to_string(),
                (None, _) => "loop ended before finalization".to_string(),
            };
            if let Some(e) = halted_by {
                state.push_warning(format!("loop halted: {}", e));
            }
            finalize_halted(&mut state, &reason);
        }
        info!(
            attempts = state.attempts,
            cost = state.cost_used,
            answers = state.final_answers.len(),
            "research session finished"
        );
        state
    }

    /// Runs one session and returns its final output.
    pub async fn invoke(&self, request: ResearchRequest) -> FinalOutput {
        let mut state = self.invoke_with_state(request).await;
        match state.final_output.take() {
            Some(output) => output,
            None => finalize_halted(&mut state, "no output recorded"),
        }
    }

    /// Runs several sessions concurrently; outputs are in request order.
    pub async fn invoke_many(&self, requests: Vec<ResearchRequest>) -> Vec<FinalOutput> {
        join_all(requests.into_iter().map(|r| self.invoke(r))).await
    }
}
