//! # bats
//!
//! A budget-aware research agent. Given a question and a per-resource tool budget
//! (e.g. `search: 3`, `browse: 2`), it plans, calls tools, verifies its progress and
//! returns either an answer or the sentinel `NONE`. It never calls a tool whose
//! budget is spent.
//!
//! The loop is a [`StateGraph`] over [`SessionState`]:
//!
//! - **think** ([`ThinkNode`]): the planner reads the budget tier and chooses a tool
//!   call, an answer, another planning step, or stop.
//! - **act** ([`ActNode`]): the tool invoker charges the [`BudgetTracker`] and runs
//!   the calls; exhausted resources are refused without calling the tool.
//! - **verify** ([`VerifyNode`]): SUCCESS, CONTINUE or PIVOT; compacts the trajectory
//!   and applies a [`PivotStrategy`].
//! - **finalize** ([`FinalizeNode`]): emits the verified answer or `NONE`.
//!
//! ## Main modules
//!
//! - [`agent`]: the four nodes, routing, [`AgentConfig`] and [`ResearchRunner`].
//! - [`budget`]: [`BudgetTracker`], [`BudgetTier`], [`TierThresholds`].
//! - [`state`]: [`SessionState`], [`Plan`], tool call / result records, [`FinalOutput`].
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`].
//! - [`llm`]: [`LlmClient`], [`ChatOpenAI`], [`MockLlm`], [`RetryingLlm`].
//! - [`tool_source`] / [`tools`]: [`ToolSource`], [`SearchTool`], [`BrowseTool`], [`MockToolSource`].
//! - [`prompts`]: YAML prompt templates for the planner, verifier and finalizer.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bats::{AgentConfig, MockLlm, MockToolSource, ResearchRequest, ResearchRunner};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = ResearchRunner::new(
//!     Arc::new(MockLlm::with_content("<stop/>")),
//!     Arc::new(MockToolSource::research_example()),
//!     AgentConfig::default(),
//! )?;
//! let output = runner
//!     .invoke(ResearchRequest::new("Explain LangGraph workflow").with_budget([("search", 3), ("browse", 2)]))
//!     .await;
//! println!("{}", output.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod budget;
pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod prompts;
pub mod retry;
pub mod state;
pub mod tool_source;
pub mod tools;

pub use agent::{
    ActNode, AgentConfig, ConfigError, CostTable, FinalizeNode, FullReset, IncrementalRevision,
    PivotMode, PivotStrategy, ResearchRunner, ResearchRunnerBuilder, RunError, ThinkNode,
    VerifyNode,
};
pub use budget::{BudgetError, BudgetTier, BudgetTracker, ResourceBudget, TierThresholds};
pub use error::AgentError;
pub use graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, END, START};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, RetryingLlm};
pub use message::Message;
pub use prompts::{PromptTemplate, ResearchPrompts};
pub use retry::RetryPolicy;
pub use state::{
    FinalOutput, NextAction, Plan, ResearchRequest, SessionState, ToolCallRecord,
    ToolResultRecord, ToolStatus, VerificationDecision, Verdict, NO_ANSWER,
};
pub use tool_source::{MockToolSource, ToolCallContent, ToolSource, ToolSourceError, ToolSpec};
pub use tools::{AggregateToolSource, BrowseTool, SearchTool};
