//! Turns parsed flags and the environment into an `AgentConfig`, a runner and requests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bats::{
    AgentConfig, AggregateToolSource, BrowseTool, ChatOpenAI, ConfigError, LlmClient,
    MockToolSource, ResearchRequest, ResearchRunner, RunError, SearchTool, ToolSource,
    ToolSourceError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::args::{AgentFlags, AskArgs};
use crate::demo::DemoLlm;

/// Model used when neither `--model` nor `OPENAI_MODEL` is given.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("environment config: {0}")]
    Env(#[from] config::LoadError),
    #[error("agent config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("list tools: {0}")]
    Tools(#[from] ToolSourceError),
    #[error("encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("question is empty")]
    EmptyQuestion,
}

/// `AgentConfig::from_env` with command-line overrides.
pub fn agent_config(flags: &AgentFlags) -> Result<AgentConfig, CliError> {
    let mut config = AgentConfig::from_env()?;
    if let Some(n) = flags.max_attempts {
        config = config.with_max_attempts(n);
    }
    if let Some(mode) = flags.pivot {
        config = config.with_pivot_mode(mode);
    }
    Ok(config)
}

pub fn tool_source(mock: bool) -> Arc<dyn ToolSource> {
    if mock {
        return Arc::new(MockToolSource::research_example());
    }
    let search = SearchTool::from_env();
    if !search.has_api_key() {
        warn!("EXA_API_KEY is not set; search calls will fail");
    }
    Arc::new(
        AggregateToolSource::new()
            .with_tool(Box::new(search))
            .with_tool(Box::new(BrowseTool::new())),
    )
}

pub fn llm(mock: bool, model: Option<&str>) -> Arc<dyn LlmClient> {
    if mock {
        return Arc::new(DemoLlm);
    }
    let model = model
        .map(str::to_string)
        .or_else(|| std::env::var("OPENAI_MODEL").ok().filter(|m| !m.is_empty()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    info!(%model, "using chat model");
    Arc::new(ChatOpenAI::new(model))
}

pub fn build_runner(mock: bool, flags: &AgentFlags) -> Result<ResearchRunner, CliError> {
    let config = agent_config(flags)?;
    Ok(ResearchRunner::new(
        llm(mock, flags.model.as_deref()),
        tool_source(mock),
        config,
    )?)
}

/// Request for `ask`: the configured default budget, then `--search`/`--browse`,
/// then `--budget` entries, later ones winning.
pub fn ask_request(args: &AskArgs, config: &AgentConfig) -> Result<ResearchRequest, CliError> {
    let question = args.question.join(" ");
    if question.trim().is_empty() {
        return Err(CliError::EmptyQuestion);
    }
    let mut totals = config.default_budget.clone();
    if let Some(n) = args.search {
        totals.insert("search".to_string(), n);
    }
    if let Some(n) = args.browse {
        totals.insert("browse".to_string(), n);
    }
    totals.extend(args.budget.iter().cloned());

    let mut request = ResearchRequest::new(question).with_budget(totals);
    if let Some(n) = args.agent.max_attempts {
        request = request.with_max_attempts(n);
    }
    Ok(request)
}

/// Requests from a JSON file: a single object or an array of objects.
pub fn read_requests(path: &Path) -> Result<Vec<ResearchRequest>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| CliError::Input {
            path: path.to_path_buf(),
            source,
        })?;
    let parsed = if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|r| vec![r])
    };
    parsed.map_err(|source| CliError::Input {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask(extra: &[&str]) -> AskArgs {
        use clap::Parser;
        let mut argv = vec!["bats", "ask", "what", "is", "it"];
        argv.extend_from_slice(extra);
        match crate::args::Cli::parse_from(argv).cmd {
            crate::args::Command::Ask(a) => a,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn ask_request_layers_budget_flags() {
        let config = AgentConfig::default();
        let r = ask_request(&ask(&[]), &config).unwrap();
        assert_eq!(r.question, "what is it");
        let budget = r.budget.unwrap();
        assert_eq!(budget["search"].total, 3);
        assert_eq!(budget["browse"].total, 2);
        assert_eq!(r.max_attempts, None);

        let r = ask_request(
            &ask(&["--search", "1", "--budget", "search=7", "--budget", "fetch=2", "--max-attempts", "3"]),
            &config,
        )
        .unwrap();
        let budget = r.budget.unwrap();
        assert_eq!(budget["search"].total, 7);
        assert_eq!(budget["fetch"].total, 2);
        assert_eq!(r.max_attempts, Some(3));
    }

    #[test]
    fn read_requests_accepts_object_or_array() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.json");
        std::fs::write(&one, r#"{"question":"q1","budget":{"search":{"total":1}}}"#).unwrap();
        let many = dir.path().join("many.json");
        std::fs::write(&many, r#"[{"question":"a"},{"question":"b","max_attempts":3}]"#).unwrap();

        let r = read_requests(&one).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].budget.as_ref().unwrap()["search"].total, 1);
        let r = read_requests(&many).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r[1].max_attempts, Some(3));
    }

    #[test]
    fn read_requests_reports_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"budget":{}}"#).unwrap();
        assert!(matches!(read_requests(&bad), Err(CliError::Input { .. })));
        assert!(matches!(
            read_requests(&dir.path().join("missing.json")),
            Err(CliError::Read { .. })
        ));
    }
}
