//! Concrete tools and the registry-backed `AggregateToolSource`.
//!
//! `SearchTool` (Exa web search) consumes the `search` budget; `BrowseTool`
//! (page fetch + text extraction) consumes the `browse` budget.

mod aggregate_source;
mod browse;
mod registry;
mod search;
mod r#trait;

pub use aggregate_source::AggregateToolSource;
pub use browse::{html_to_text, truncate_text, BrowseTool, DEFAULT_BROWSE_MAX_CHARS, TOOL_BROWSE};
pub use r#trait::Tool;
pub use registry::ToolRegistry;
pub use search::{SearchTool, TOOL_SEARCH};
