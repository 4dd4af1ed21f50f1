//! Verifier node: SUCCESS / CONTINUE / PIVOT, and the trajectory compaction point.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::state::{
    ConstraintStatus, SessionState, ToolStatus, VerificationDecision, Verdict,
};
use crate::tools::truncate_text;

use super::config::AgentConfig;
use super::numbered;
use super::parse::{decode_verdict, VerifierReply};
use super::pivot::PivotStrategy;
use super::route::NODE_VERIFY;
use super::LOG_PREVIEW_CHARS;

/// Deterministic stand-in when the model gave no trajectory summary.
pub fn trajectory_digest(state: &SessionState) -> String {
    let count = |status: ToolStatus| {
        state
            .tool_results
            .iter()
            .filter(|r| r.status == status)
            .count()
    };
    let last = state
        .last_trajectory_entry()
        .map(|e| truncate_text(e, 200))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "{} step(s) toward \"{}\"; tool results: {} ok, {} refused, {} failed; budget: {}; last step: {}",
        state.trajectory.len(),
        state.question,
        count(ToolStatus::Ok),
        count(ToolStatus::Refused),
        count(ToolStatus::Failed),
        state.budget.status_line(),
        last
    )
}

/// Strategic verifier.
///
/// Decision rule, applied after decoding the model's verdict:
/// 1. With constraints reported, SUCCESS iff every one is satisfied (a claimed
///    SUCCESS with an open constraint becomes CONTINUE).
/// 2. PIVOT when the model says so, every budget is exhausted, enough failed tool
///    results arrived since the last verification, or the loop has stalled.
/// 3. CONTINUE otherwise. Undecodable replies and call failures also land here,
///    with a warning.
///
/// Except on SUCCESS the trajectory is replaced by one summary entry. PIVOT
/// increments `attempts` and applies the pivot strategy.
pub struct VerifyNode {
    llm: Arc<dyn LlmClient>,
    config: Arc<AgentConfig>,
    pivot: Arc<dyn PivotStrategy>,
}

impl VerifyNode {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<AgentConfig>) -> Self {
        let pivot = config.pivot_mode.strategy();
        Self { llm, config, pivot }
    }

    pub fn with_pivot_strategy(mut self, pivot: Arc<dyn PivotStrategy>) -> Self {
        self.pivot = pivot;
        self
    }

    async fn ask(&self, state: &mut SessionState) -> Result<VerifierReply, String> {
        let trajectory = numbered(&state.trajectory);
        let current_answer = if state.current_answer.is_empty() {
            "(none yet)".to_string()
        } else {
            state.current_answer.clone()
        };
        let budget_status = state.budget.status_line();
        let attempts = state.attempts.to_string();
        let max_attempts = state.max_attempts.to_string();
        let messages = self.config.prompts.verify.render(&[
            ("question", state.question.as_str()),
            ("trajectory", trajectory.as_str()),
            ("current_answer", current_answer.as_str()),
            ("budget_status", budget_status.as_str()),
            ("attempts", attempts.as_str()),
            ("max_attempts", max_attempts.as_str()),
        ]);
        let reply = self
            .llm
            .invoke(&messages)
            .await
            .map_err(|e| format!("verifier call failed: {}", e))?;
        if let Some(usage) = &reply.usage {
            state.record_usage(usage, self.config.costs.llm_cost_per_1k_tokens);
        }
        debug!(
            session_id = %state.session_id,
            reply = %truncate_text(&reply.content, LOG_PREVIEW_CHARS),
            "verifier reply"
        );
        decode_verdict(&reply.content).map_err(|e| format!("verifier reply undecodable: {}", e))
    }
}

#[async_trait]
impl Node<SessionState> for VerifyNode {
    fn id(&self) -> &str {
        NODE_VERIFY
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        let mut state = state;
        let cfg = &self.config;
        let new_results = state.results_since_last_verify().len();
        let failures = state.failures_since_last_verify();

        let reply = match self.ask(&mut state).await {
            Ok(r) => r,
            Err(reason) => {
                state.push_warning(format!("{}; treating as CONTINUE", reason));
                VerifierReply {
                    decision: VerificationDecision::Continue,
                    constraints: Vec::new(),
                    justification: reason,
                    trajectory_summary: String::new(),
                }
            }
        };

        let mut decision = reply.decision;
        let mut justification = reply.justification;
        if !reply.constraints.is_empty() {
            let all_satisfied = reply
                .constraints
                .iter()
                .all(|c| c.status == ConstraintStatus::Satisfied);
            if all_satisfied {
                decision = VerificationDecision::Success;
            } else if decision == VerificationDecision::Success {
                decision = VerificationDecision::Continue;
                justification = format!("{} (open constraints remain)", justification)
                    .trim()
                    .to_string();
            }
        }

        let stalled = if decision == VerificationDecision::Continue && new_results == 0 {
            state.stalled_verifications + 1
        } else {
            0
        };
        if decision == VerificationDecision::Continue {
            let forced = if state.budget.all_exhausted() {
                Some("budget exhausted".to_string())
            } else if cfg.consecutive_failure_limit > 0 && failures >= cfg.consecutive_failure_limit {
                Some(format!("{} failed tool calls since last verification", failures))
            } else if cfg.stall_limit > 0 && stalled >= cfg.stall_limit {
                Some(format!("no progress in {} verifications", stalled))
            } else {
                None
            };
            if let Some(reason) = forced {
                decision = VerificationDecision::Pivot;
                justification = if justification.is_empty() {
                    reason
                } else {
                    format!("{}; {}", justification, reason)
                };
            }
        }
        state.stalled_verifications = if decision == VerificationDecision::Continue {
            stalled
        } else {
            0
        };

        let summary = if reply.trajectory_summary.is_empty() {
            trajectory_digest(&state)
        } else {
            reply.trajectory_summary
        };
        let verdict = Verdict {
            decision,
            trajectory_summary: summary,
            justification,
            constraints: reply.constraints,
        };

        if decision != VerificationDecision::Success {
            state.trajectory = vec![format!(
                "Verification {} (attempt {}): {}",
                decision,
                state.attempts + 1,
                verdict.trajectory_summary
            )];
        }
        if decision == VerificationDecision::Pivot {
            state.attempts += 1;
            self.pivot.pivot(&mut state, &verdict);
        }
        state.verification_decision = decision;
        state.tool_results_at_last_verify = state.tool_results.len();
        info!(
            session_id = %state.session_id,
            %decision,
            attempts = state.attempts,
            pivot = self.pivot.name(),
            justification = %truncate_text(&verdict.justification, LOG_PREVIEW_CHARS),
            "verification"
        );
        state.last_verdict = Some(verdict);
        Ok((state, Next::Continue))
    }
}
