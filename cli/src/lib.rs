//! Library side of the `bats` binary: argument types, runner setup, the offline
//! demo model and output rendering. `main.rs` only wires these together.

pub mod args;
pub mod demo;
pub mod output;
pub mod setup;

pub use args::{AgentFlags, AskArgs, Cli, Command, RunArgs};
pub use demo::DemoLlm;
pub use output::{render_text, render_tools_text, tool_rows, ToolRow};
pub use setup::{agent_config, ask_request, build_runner, read_requests, tool_source, CliError};
