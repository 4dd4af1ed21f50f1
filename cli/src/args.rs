//! Command-line arguments.

use std::path::PathBuf;

use bats::PivotMode;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bats")]
#[command(about = "bats: budget-aware research agent (plan, search, browse, verify)")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// Verbose: debug-level logs (node enter/exit, model replies, tool output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Offline: canned tool results and a deterministic demo model, no network
    #[arg(long, global = true)]
    pub mock: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Research one question under a tool budget
    Ask(AskArgs),
    /// Run research requests from a JSON file (one object or an array) concurrently
    Run(RunArgs),
    /// List available tools with the budget resource and cost of one call
    Tools,
}

/// Overrides applied on top of `BATS_*` environment settings.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AgentFlags {
    /// Attempts before giving up (a PIVOT uses one attempt)
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Pivot strategy: reset (abandon the plan) or revise (amend it)
    #[arg(long, value_name = "MODE")]
    pub pivot: Option<PivotMode>,

    /// Chat model (default: OPENAI_MODEL or gpt-4o-mini)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AskArgs {
    /// The question (several words are joined with spaces)
    #[arg(required = true, value_name = "QUESTION")]
    pub question: Vec<String>,

    /// Search calls allowed
    #[arg(long, value_name = "N")]
    pub search: Option<u32>,

    /// Browse calls allowed
    #[arg(long, value_name = "N")]
    pub browse: Option<u32>,

    /// Allowance for any resource, e.g. --budget search=5 (repeatable)
    #[arg(long, value_name = "NAME=TOTAL", value_parser = parse_budget_arg)]
    pub budget: Vec<(String, u32)>,

    #[command(flatten)]
    pub agent: AgentFlags,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON file with `{question, budget, max_attempts}` objects
    #[arg(long, short, value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub agent: AgentFlags,
}

/// Parses `name=total`.
pub fn parse_budget_arg(s: &str) -> Result<(String, u32), String> {
    let (name, total) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TOTAL, got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty resource name in {:?}", s));
    }
    let total = total
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad total in {:?}: {}", s, e))?;
    Ok((name.to_string(), total))
}
