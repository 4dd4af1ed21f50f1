//! Answer finalizer: the terminal output, never fabricated.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::state::{FinalOutput, SessionState, VerificationDecision, NO_ANSWER};
use crate::tools::truncate_text;

use super::config::AgentConfig;
use super::numbered;
use super::parse::{decode_final, is_sentinel};
use super::route::NODE_FINALIZE;
use super::LOG_PREVIEW_CHARS;

/// Records `answer` as the session's terminal output.
///
/// Appends to `final_answers` (every finalization is kept) and sets `final_output`.
pub fn record_final(state: &mut SessionState, answer: String) -> FinalOutput {
    if !is_sentinel(&answer) {
        state.current_answer = answer.clone();
    }
    state.final_answers.push(answer.clone());
    let output = FinalOutput {
        answer,
        attempts_used: state.attempts,
        cost_used: state.cost_used,
    };
    state.final_output = Some(output.clone());
    output
}

/// Sentinel path for a loop that halted without reaching the finalizer
/// (planner stop, recursion limit).
pub fn finalize_halted(state: &mut SessionState, reason: &str) -> FinalOutput {
    info!(session_id = %state.session_id, reason, "halted without answer");
    state.trajectory.push(format!("Halted: {}", reason));
    record_final(state, NO_ANSWER.to_string())
}

/// Answer finalizer. Rules, first match wins:
/// 1. SUCCESS with a non-empty candidate: the candidate verbatim.
/// 2. Attempts used up, or no candidate and no budget left: `NONE`.
/// 3. One more reasoning pass; the `<answer>` region, or `NONE` when it is
///    missing, is the sentinel, or its `<confidence>` is below `min_confidence`.
pub struct FinalizeNode {
    llm: Arc<dyn LlmClient>,
    config: Arc<AgentConfig>,
}

impl FinalizeNode {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<AgentConfig>) -> Self {
        Self { llm, config }
    }

    async fn one_more_pass(&self, state: &mut SessionState) -> String {
        let trajectory = numbered(&state.trajectory);
        let tool_results = numbered(
            &state
                .tool_results
                .iter()
                .map(|r| format!("[{}] {}: {}", r.status, r.tool, r.output))
                .collect::<Vec<_>>(),
        );
        let candidate = if state.current_answer.is_empty() {
            "None".to_string()
        } else {
            state.current_answer.clone()
        };
        let messages = self.config.prompts.finalize.render(&[
            ("question", state.question.as_str()),
            ("trajectory", trajectory.as_str()),
            ("tool_results", tool_results.as_str()),
            ("current_answer", candidate.as_str()),
        ]);
        let reply = match self.llm.invoke(&messages).await {
            Ok(r) => r,
            Err(e) => {
                state.push_warning(format!("finalizer call failed: {}", e));
                return NO_ANSWER.to_string();
            }
        };
        if let Some(usage) = &reply.usage {
            state.record_usage(usage, self.config.costs.llm_cost_per_1k_tokens);
        }
        debug!(
            session_id = %state.session_id,
            reply = %truncate_text(&reply.content, LOG_PREVIEW_CHARS),
            "finalizer reply"
        );
        match decode_final(&reply.content) {
            None => {
                state.push_warning("finalizer reply had no <answer> tag");
                NO_ANSWER.to_string()
            }
            Some((answer, _)) if is_sentinel(&answer) => NO_ANSWER.to_string(),
            Some((_, Some(confidence))) if confidence < self.config.min_confidence => {
                state.push_warning(format!(
                    "finalizer confidence {:.2} below {:.2}",
                    confidence, self.config.min_confidence
                ));
                NO_ANSWER.to_string()
            }
            Some((answer, _)) => answer,
        }
    }
}

#[async_trait]
impl Node<SessionState> for FinalizeNode {
    fn id(&self) -> &str {
        NODE_FINALIZE
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        let mut state = state;
        let has_candidate = !state.current_answer.trim().is_empty();
        let (answer, rule) = if state.verification_decision == VerificationDecision::Success
            && has_candidate
        {
            (state.current_answer.clone(), "verified")
        } else if state.attempts >= state.max_attempts
            || (!has_candidate && state.budget.all_exhausted())
        {
            (NO_ANSWER.to_string(), "exhausted")
        } else {
            (self.one_more_pass(&mut state).await, "final pass")
        };
        let output = record_final(&mut state, answer);
        info!(
            session_id = %state.session_id,
            rule,
            answer = %truncate_text(&output.answer, LOG_PREVIEW_CHARS),
            attempts = output.attempts_used,
            cost = output.cost_used,
            "finalized"
        );
        Ok((state, Next::End))
    }
}
