//! `bats` binary: ask one question, run a batch from a file, or list tools.

mod log_format;
mod logging;

use std::process::ExitCode;

use clap::Parser;
use cli::{
    agent_config, ask_request, build_runner, read_requests, render_text, render_tools_text,
    tool_rows, tool_source, Cli, CliError, Command,
};

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.cmd {
        Command::Ask(args) => {
            let runner = build_runner(cli.mock, &args.agent)?;
            let request = ask_request(&args, runner.config())?;
            let output = runner.invoke(request).await;
            if cli.json {
                print_json(&output)?;
            } else {
                println!("{}", render_text(&output));
            }
        }
        Command::Run(args) => {
            let requests = read_requests(&args.input)?;
            let runner = build_runner(cli.mock, &args.agent)?;
            tracing::info!(count = requests.len(), "running requests");
            let outputs = runner.invoke_many(requests).await;
            print_json(&outputs)?;
        }
        Command::Tools => {
            let config = agent_config(&Default::default())?;
            let specs = tool_source(cli.mock).list_tools().await?;
            let rows = tool_rows(&specs, &config);
            if cli.json {
                print_json(&rows)?;
            } else {
                println!("{}", render_tools_text(&rows, &config));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let applied = match config::load_and_apply("bats", None) {
        Ok(applied) => applied,
        Err(e) => {
            eprintln!("bats: {}", CliError::from(e));
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("bats: logging: {}", e);
        return ExitCode::FAILURE;
    }
    for (key, source) in &applied {
        tracing::debug!(%key, ?source, "environment variable loaded from config");
    }

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("bats: {}", e);
            ExitCode::FAILURE
        }
    }
}
