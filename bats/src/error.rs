//! Agent execution error types.
//!
//! Returned by graph nodes, LLM clients and the compiled graph. The research loop
//! itself recovers from every business-logic failure; an `AgentError` that reaches
//! the runner is turned into the "NONE" sentinel output.

use thiserror::Error;

/// Error when running a node, calling the reasoning endpoint, or driving the graph.
///
/// **Interaction**: Returned by `Node::run`, `LlmClient::invoke` and
/// `CompiledStateGraph::invoke`.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A step failed (LLM call, request build, empty graph, ...).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The graph executed more node steps than its recursion limit allows.
    #[error("recursion limit of {0} steps reached")]
    RecursionLimit(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(
            s.contains("execution failed"),
            "Display should contain 'execution failed': {}",
            s
        );
        assert!(s.contains("msg"), "Display should contain message: {}", s);
    }

    #[test]
    fn agent_error_display_recursion_limit() {
        let err = AgentError::RecursionLimit(50);
        let s = err.to_string();
        assert!(s.contains("recursion limit"), "{}", s);
        assert!(s.contains("50"), "{}", s);
    }
}
