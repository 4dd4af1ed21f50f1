//! Tool invoker: runs the pending tool calls against the budget and records the results.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::retry::retry_async;
use crate::state::{NextAction, SessionState, ToolCallRecord, ToolResultRecord};
use crate::tool_source::{ToolSource, ToolSourceError, ToolSpec};
use crate::tools::truncate_text;

use super::config::AgentConfig;
use super::route::NODE_ACT;
use super::LOG_PREVIEW_CHARS;

/// What the invoker decided for one call before anything is dispatched.
enum Slot {
    /// Already settled (unknown tool, refused).
    Settled(ToolResultRecord),
    /// Budget charged; the call runs.
    Dispatch,
}

/// Tool invoker: the only writer of the budget.
///
/// For every pending call, in request order:
/// - unknown tool: `failed: unknown tool`, no charge;
/// - resource remaining is 0 (including units taken by earlier calls of the same
///   batch): `refused: budget exhausted`, no call;
/// - otherwise one unit is charged and the resource cost added to `cost_used`.
///
/// Charged calls run concurrently and are all awaited; each keeps its own outcome,
/// so one failure never discards a sibling's result. Always routes back to think.
pub struct ActNode {
    tools: Arc<dyn ToolSource>,
    config: Arc<AgentConfig>,
}

impl ActNode {
    pub fn new(tools: Arc<dyn ToolSource>, config: Arc<AgentConfig>) -> Self {
        Self { tools, config }
    }

    fn settle(state: &mut SessionState, config: &AgentConfig, specs: &[ToolSpec], call: &ToolCallRecord) -> Slot {
        let Some(spec) = specs.iter().find(|s| s.name == call.name) else {
            return Slot::Settled(ToolResultRecord::failed(
                &call.name,
                format!("failed: unknown tool '{}'", call.name),
            ));
        };
        let resource = spec.resource_name();
        match state.budget.charge(resource) {
            Ok(()) => {
                state.cost_used += config.costs.tool_cost(resource);
                Slot::Dispatch
            }
            Err(e) => Slot::Settled(ToolResultRecord::refused(
                &call.name,
                format!(
                    "refused: budget exhausted for {} ({} remaining): {}",
                    resource,
                    state.budget.remaining(resource),
                    e
                ),
            )),
        }
    }

    async fn dispatch(&self, call: &ToolCallRecord) -> ToolResultRecord {
        let label = format!("tool.{}", call.name);
        let outcome = retry_async(
            &self.config.tool_retry,
            &label,
            |e: &ToolSourceError| e.is_transient(),
            || self.tools.call_tool(&call.name, call.arguments_json()),
        )
        .await;
        match outcome {
            Ok(content) => ToolResultRecord::ok(&call.name, content.text),
            Err(e) => ToolResultRecord::failed(&call.name, format!("failed: {}", e)),
        }
    }
}

#[async_trait]
impl Node<SessionState> for ActNode {
    fn id(&self) -> &str {
        NODE_ACT
    }

    async fn run(&self, state: SessionState) -> Result<(SessionState, Next), AgentError> {
        let mut state = state;
        let calls = std::mem::take(&mut state.pending_tool_calls);
        state.next_action = Some(NextAction::Continue);
        if calls.is_empty() {
            state.trajectory.push("Act: no pending tool call".to_string());
            return Ok((state, Next::Continue));
        }

        let specs = match self.tools.list_tools().await {
            Ok(specs) => specs,
            Err(e) => {
                warn!(session_id = %state.session_id, error = %e, "listing tools failed");
                Vec::new()
            }
        };
        let slots: Vec<Slot> = calls
            .iter()
            .map(|call| Self::settle(&mut state, &self.config, &specs, call))
            .collect();

        let dispatched = join_all(
            calls
                .iter()
                .zip(&slots)
                .filter(|(_, slot)| matches!(slot, Slot::Dispatch))
                .map(|(call, _)| {
                    info!(
                        session_id = %state.session_id,
                        tool = %call.name,
                        args = %truncate_text(&call.arguments_json().to_string(), LOG_PREVIEW_CHARS),
                        "dispatching tool call"
                    );
                    self.dispatch(call)
                }),
        )
        .await;

        let mut dispatched = dispatched.into_iter();
        for (call, slot) in calls.iter().zip(slots) {
            let result = match slot {
                Slot::Settled(r) => r,
                Slot::Dispatch => match dispatched.next() {
                    Some(r) => r,
                    None => ToolResultRecord::failed(&call.name, "failed: no outcome recorded"),
                },
            };
            debug!(
                session_id = %state.session_id,
                tool = %result.tool,
                status = %result.status,
                output = %truncate_text(&result.output, LOG_PREVIEW_CHARS),
                "tool result"
            );
            state.trajectory.push(format!(
                "Tool call {} -> {}: {}",
                call, result.status, result.output
            ));
            state.tool_results.push(result);
        }
        Ok((state, Next::Continue))
    }
}
