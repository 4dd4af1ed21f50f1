//! Session state threaded through think / act / verify / finalize.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::budget::{BudgetTier, BudgetTracker, TierThresholds};
use crate::llm::LlmUsage;

use super::plan::Plan;
use super::records::{
    FinalOutput, NextAction, ToolCallRecord, ToolResultRecord, VerificationDecision, Verdict,
};

/// Per-resource allowance in an invocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTotal {
    pub total: u32,
}

/// Invocation input: `{question, budget: {name: {total}}, max_attempts}`.
///
/// A missing `budget` or `max_attempts` takes the runner's configured default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BTreeMap<String, ResourceTotal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl ResearchRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            budget: None,
            max_attempts: None,
        }
    }

    pub fn with_budget<I, K>(mut self, totals: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        self.budget = Some(
            totals
                .into_iter()
                .map(|(k, total)| (k.into(), ResourceTotal { total }))
                .collect(),
        );
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Single mutable record for one question.
///
/// Created once per question, replaced wholesale by each node, discarded after
/// the final output is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Correlates log lines of concurrent sessions.
    pub session_id: String,
    pub question: String,
    pub plan: Plan,
    pub budget: BudgetTracker,
    pub trajectory: Vec<String>,
    pub tool_results: Vec<ToolResultRecord>,
    pub current_answer: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_action: Option<NextAction>,
    /// Calls requested by the planner; emptied by the invoker.
    pub pending_tool_calls: Vec<ToolCallRecord>,
    pub verification_decision: VerificationDecision,
    pub final_answers: Vec<String>,
    /// Cumulative tool cost plus LLM token cost.
    pub cost_used: f64,
    pub warnings: Vec<String>,
    pub last_verdict: Option<Verdict>,
    /// `tool_results.len()` when the verifier last ran.
    pub tool_results_at_last_verify: usize,
    /// Consecutive CONTINUE decisions without new tool results.
    pub stalled_verifications: u32,
    pub final_output: Option<FinalOutput>,
    pub usage: Option<LlmUsage>,
}

impl SessionState {
    /// Fresh state: counters at zero, budgets at their totals.
    ///
    /// `max_attempts` below 1 is raised to 1 so a PIVOT can always reach finalize
    /// with `attempts <= max_attempts`.
    pub fn new(question: impl Into<String>, budget: BudgetTracker, max_attempts: u32) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        if max_attempts == 0 {
            tracing::warn!(session_id = %session_id, "max_attempts 0 raised to 1");
        }
        Self {
            session_id,
            question: question.into(),
            plan: Plan::new(),
            budget,
            trajectory: Vec::new(),
            tool_results: Vec::new(),
            current_answer: String::new(),
            attempts: 0,
            max_attempts: max_attempts.max(1),
            next_action: None,
            pending_tool_calls: Vec::new(),
            verification_decision: VerificationDecision::None,
            final_answers: Vec::new(),
            cost_used: 0.0,
            warnings: Vec::new(),
            last_verdict: None,
            tool_results_at_last_verify: 0,
            stalled_verifications: 0,
            final_output: None,
            usage: None,
        }
    }

    pub fn tier(&self, thresholds: &TierThresholds) -> BudgetTier {
        self.budget.classify(thresholds)
    }

    pub fn last_trajectory_entry(&self) -> Option<&str> {
        self.trajectory.last().map(String::as_str)
    }

    pub fn last_tool_result(&self) -> Option<&ToolResultRecord> {
        self.tool_results.last()
    }

    pub fn has_ok_result(&self) -> bool {
        self.tool_results.iter().any(ToolResultRecord::is_ok)
    }

    /// True when the last `n` tool results since the last verification exist and
    /// none of them is ok. A verification (and so every pivot) opens a new window.
    pub fn last_results_all_failed(&self, n: usize) -> bool {
        let recent = self.results_since_last_verify();
        n > 0 && recent.len() >= n && recent[recent.len() - n..].iter().all(|r| !r.is_ok())
    }

    pub fn results_since_last_verify(&self) -> &[ToolResultRecord] {
        let from = self.tool_results_at_last_verify.min(self.tool_results.len());
        &self.tool_results[from..]
    }

    pub fn failures_since_last_verify(&self) -> usize {
        self.results_since_last_verify()
            .iter()
            .filter(|r| !r.is_ok())
            .count()
    }

    /// Adds token usage from one LLM call and its cost at `cost_per_1k_tokens`.
    pub fn record_usage(&mut self, usage: &LlmUsage, cost_per_1k_tokens: f64) {
        let total = self.usage.get_or_insert_with(LlmUsage::default);
        total.prompt_tokens += usage.prompt_tokens;
        total.completion_tokens += usage.completion_tokens;
        total.total_tokens += usage.total_tokens;
        self.cost_used += f64::from(usage.total_tokens) / 1000.0 * cost_per_1k_tokens;
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!(session_id = %self.session_id, %warning, "session warning");
        self.warnings.push(warning);
    }
}
