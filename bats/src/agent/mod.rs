//! The research loop: planner (think), tool invoker (act), verifier (verify) and
//! finalizer (finalize), wired into a `StateGraph<SessionState>` by `ResearchRunner`.
//!
//! ```text
//! START -> think -+-> act ------> think
//!                 +-> verify -+-> think
//!                 |           +-> finalize -> END
//!                 +-> finalize
//!                 +-> END (stop; the runner records NONE)
//! ```

mod act_node;
mod config;
mod finalize_node;
pub mod parse;
mod pivot;
mod route;
mod runner;
mod think_node;
mod verify_node;

pub use act_node::ActNode;
pub use config::{AgentConfig, ConfigError, CostTable, PivotMode};
pub use finalize_node::{finalize_halted, record_final, FinalizeNode};
pub use pivot::{FullReset, IncrementalRevision, PivotStrategy};
pub use route::{
    route_after_think, route_after_verify, NODE_ACT, NODE_FINALIZE, NODE_THINK, NODE_VERIFY,
};
pub use runner::{ResearchRunner, ResearchRunnerBuilder, RunError};
pub use think_node::ThinkNode;
pub use verify_node::{trajectory_digest, VerifyNode};

/// Characters of model replies and tool output shown in log lines.
pub(crate) const LOG_PREVIEW_CHARS: usize = 300;

/// Renders entries as `1. ...` lines, or `None` when empty.
pub(crate) fn numbered(entries: &[String]) -> String {
    if entries.is_empty() {
        return "None".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("{}. {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n")
}
