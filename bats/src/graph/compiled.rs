//! Compiled state graph: immutable, supports invoke only.
//!
//! Built by `StateGraph::compile`. Holds nodes, the resolved next-node map and an
//! optional middleware. Each `invoke` runs from the first node until END and is
//! bounded by a recursion limit.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
};
use super::node_middleware::NodeMiddleware;
use super::state_graph::END;
use super::{Next, NextEntry, Node};

/// Default maximum number of node executions per invoke.
pub const DEFAULT_RECURSION_LIMIT: usize = 50;

/// Executable graph. Cheap to clone (nodes are shared).
///
/// **Interaction**: Built by `StateGraph::compile`; driven by `ResearchRunner`.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(super) recursion_limit: usize,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    async fn execute_node(&self, node: Arc<dyn Node<S>>, state: S) -> Result<(S, Next), AgentError> {
        match &self.middleware {
            Some(middleware) => {
                let node_id = node.id().to_string();
                middleware
                    .around_run(
                        &node_id,
                        state,
                        Box::new(move |s| Box::pin(async move { node.run(s).await })),
                    )
                    .await
            }
            None => node.run(state).await,
        }
    }

    fn resolve_next(&self, current_id: &str, state: &S, next: Next) -> String {
        match self.next_map.get(current_id) {
            Some(NextEntry::Conditional(router)) => {
                let target = router.resolve_next(state);
                tracing::debug!(from = %current_id, to = %target, "conditional routing");
                target
            }
            Some(NextEntry::Unconditional(to)) => match next {
                Next::End => END.to_string(),
                Next::Node(id) => id,
                Next::Continue => to.clone(),
            },
            None => match next {
                Next::Node(id) => id,
                Next::Continue | Next::End => END.to_string(),
            },
        }
    }

    /// Runs the graph from the first node until END and returns the final state.
    ///
    /// Fails with `AgentError::RecursionLimit` when more than `recursion_limit`
    /// node executions happen, and with `ExecutionFailed` when routing names a
    /// node that does not exist.
    pub async fn invoke(&self, state: S) -> Result<S, AgentError> {
        self.invoke_or_last_state(state).await.map_err(|(_, e)| e)
    }

    /// Like `invoke`, but a failure also hands back the last state reached
    /// before the failing step, so callers can still report partial progress.
    pub async fn invoke_or_last_state(&self, state: S) -> Result<S, (S, AgentError)> {
        if !self.nodes.contains_key(&self.first_node_id) {
            return Err((state, AgentError::ExecutionFailed("empty graph".into())));
        }
        log_graph_start();
        let mut state = state;
        let mut current_id = self.first_node_id.clone();
        let mut steps = 0usize;

        loop {
            if steps >= self.recursion_limit {
                let err = AgentError::RecursionLimit(self.recursion_limit);
                log_graph_error(&err);
                return Err((state, err));
            }
            let node = match self.nodes.get(&current_id) {
                Some(n) => n.clone(),
                None => {
                    let err =
                        AgentError::ExecutionFailed(format!("unknown node: {}", current_id));
                    log_graph_error(&err);
                    return Err((state, err));
                }
            };
            log_node_start(&current_id, steps, &state);
            steps += 1;

            let before = state.clone();
            let (new_state, next) = match self.execute_node(node, state).await {
                Ok(out) => out,
                Err(e) => {
                    log_graph_error(&e);
                    return Err((before, e));
                }
            };
            state = new_state;

            let next_id = self.resolve_next(&current_id, &state, next);
            log_node_complete(&current_id, &next_id);
            if next_id == END {
                log_graph_complete(steps);
                return Ok(state);
            }
            current_id = next_id;
        }
    }

    /// Maximum node executions per invoke.
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::graph::{LoggingNodeMiddleware, StateGraph, START};

    #[derive(Clone, Debug, Default)]
    struct Counter(u32);

    struct Inc;

    #[async_trait]
    impl Node<Counter> for Inc {
        fn id(&self) -> &str {
            "inc"
        }
        async fn run(&self, state: Counter) -> Result<(Counter, Next), AgentError> {
            Ok((Counter(state.0 + 1), Next::Continue))
        }
    }

    struct CountingMiddleware(AtomicUsize);

    #[async_trait]
    impl NodeMiddleware<Counter> for CountingMiddleware {
        async fn around_run(
            &self,
            _node_id: &str,
            state: Counter,
            inner: Box<dyn FnOnce(Counter) -> crate::graph::NodeFuture<Counter> + Send>,
        ) -> Result<(Counter, Next), AgentError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            inner(state).await
        }
    }

    fn looping_graph(stop_at: u32) -> StateGraph<Counter> {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("inc", Arc::new(Inc));
        graph.add_edge(START, "inc");
        graph.add_conditional_edges(
            "inc",
            Arc::new(move |s: &Counter| {
                if s.0 >= stop_at {
                    "done".to_string()
                } else {
                    "again".to_string()
                }
            }),
            Some(
                [
                    ("done".to_string(), END.to_string()),
                    ("again".to_string(), "inc".to_string()),
                ]
                .into_iter()
                .collect(),
            ),
        );
        graph
    }

    /// **Scenario**: A conditional self-loop runs until the router returns END.
    #[tokio::test]
    async fn conditional_loop_runs_until_router_ends() {
        let compiled = looping_graph(3).compile().unwrap();
        let out = compiled.invoke(Counter::default()).await.unwrap();
        assert_eq!(out.0, 3);
    }

    /// **Scenario**: A loop that never ends is cut off at the recursion limit.
    #[tokio::test]
    async fn recursion_limit_stops_endless_loop() {
        let compiled = looping_graph(u32::MAX)
            .with_recursion_limit(5)
            .compile()
            .unwrap();
        let err = compiled.invoke(Counter::default()).await.unwrap_err();
        assert!(matches!(err, AgentError::RecursionLimit(5)));
    }

    /// **Scenario**: Hitting the recursion limit still hands back the progress made so far.
    #[tokio::test]
    async fn recursion_limit_returns_last_state() {
        let compiled = looping_graph(u32::MAX)
            .with_recursion_limit(3)
            .compile()
            .unwrap();
        let (state, err) = compiled
            .invoke_or_last_state(Counter::default())
            .await
            .unwrap_err();
        assert_eq!(state.0, 3);
        assert!(matches!(err, AgentError::RecursionLimit(3)));
    }

    /// **Scenario**: Middleware wraps every node execution.
    #[tokio::test]
    async fn middleware_sees_every_step() {
        let mw = Arc::new(CountingMiddleware(AtomicUsize::new(0)));
        let compiled = looping_graph(4)
            .with_middleware(mw.clone())
            .compile()
            .unwrap();
        compiled.invoke(Counter::default()).await.unwrap();
        assert_eq!(mw.0.load(Ordering::SeqCst), 4);
    }

    /// **Scenario**: The logging middleware passes results through unchanged.
    #[tokio::test]
    async fn logging_middleware_is_transparent() {
        let compiled = looping_graph(2)
            .with_middleware(Arc::new(LoggingNodeMiddleware::default()))
            .compile()
            .unwrap();
        let out = compiled.invoke(Counter::default()).await.unwrap();
        assert_eq!(out.0, 2);
    }
}
