//! Logging helpers for graph execution events.

use std::fmt::Debug;

/// Log node execution start, with the input state at trace level.
pub fn log_node_start<S: Debug>(node_id: &str, step: usize, state: &S) {
    tracing::debug!(node_id = node_id, step, "Starting node execution");
    tracing::trace!(node_id = node_id, state = ?state, "Node execution: state");
}

/// Log node execution completion.
pub fn log_node_complete(node_id: &str, next_id: &str) {
    tracing::debug!(node_id = node_id, next = next_id, "Node execution complete");
}

/// Log graph execution start.
pub fn log_graph_start() {
    tracing::debug!("Starting graph execution");
}

/// Log graph execution completion.
pub fn log_graph_complete(steps: usize) {
    tracing::debug!(steps, "Graph execution complete");
}

/// Log graph execution error.
pub fn log_graph_error(error: &crate::error::AgentError) {
    tracing::error!(%error, "Graph execution error");
}
