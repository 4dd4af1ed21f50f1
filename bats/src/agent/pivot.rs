//! What a PIVOT does to the plan: the single extension point for pivot behaviour.

use std::sync::Arc;

use crate::state::{SessionState, StepStatus, Verdict};

use super::config::PivotMode;

/// Applied by `VerifyNode` after `attempts` has been incremented for a PIVOT.
///
/// Implementations may rewrite the plan and the candidate answer; they must not
/// remove plan steps or touch budget, tool results or counters.
pub trait PivotStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn pivot(&self, state: &mut SessionState, verdict: &Verdict);
}

/// Abandons the current plan and starts a fresh attempt section.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullReset;

impl PivotStrategy for FullReset {
    fn name(&self) -> &'static str {
        "full-reset"
    }

    fn pivot(&self, state: &mut SessionState, verdict: &Verdict) {
        let abandoned = state.plan.mark_open_steps(StepStatus::Abandoned);
        state
            .plan
            .add_section(format!("Attempt {}", state.attempts + 1));
        if !verdict.justification.is_empty() {
            state
                .plan
                .add_step(format!("Avoid previous approach: {}", verdict.justification));
        }
        state.current_answer.clear();
        tracing::debug!(session_id = %state.session_id, abandoned, "plan reset");
    }
}

/// Keeps the plan and the candidate answer; folds the verifier's advice in as a new step.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalRevision;

impl PivotStrategy for IncrementalRevision {
    fn name(&self) -> &'static str {
        "incremental-revision"
    }

    fn pivot(&self, state: &mut SessionState, verdict: &Verdict) {
        let revised = state.plan.mark_open_steps(StepStatus::Partial);
        let step = if verdict.justification.is_empty() {
            "Revise the approach after failed verification".to_string()
        } else {
            format!("Revise: {}", verdict.justification)
        };
        state.plan.add_step(step);
        tracing::debug!(session_id = %state.session_id, revised, "plan revised");
    }
}

impl PivotMode {
    pub fn strategy(self) -> Arc<dyn PivotStrategy> {
        match self {
            PivotMode::Reset => Arc::new(FullReset),
            PivotMode::Revise => Arc::new(IncrementalRevision),
        }
    }
}
