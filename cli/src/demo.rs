//! Deterministic stand-in for the reasoning endpoint used by `--mock`.
//!
//! Replies depend only on the prompt it receives, so concurrent sessions do not
//! interfere: the planner searches first and answers from the first `ok` result,
//! the verifier accepts that answer, and the finalizer repeats the candidate.

use async_trait::async_trait;
use bats::{AgentError, LlmClient, LlmResponse, Message};

const PREVIOUS_RESULT: &str = "## Previous tool result";
const QUESTION: &str = "## Question";

/// Prompt-driven demo model.
#[derive(Debug, Default, Clone, Copy)]
pub struct DemoLlm;

/// First non-empty line after `heading` in `text`.
fn section<'a>(text: &'a str, heading: &str) -> Option<&'a str> {
    let start = text.find(heading)? + heading.len();
    text[start..].lines().map(str::trim).find(|l| !l.is_empty())
}

fn planner_reply(user: &str) -> String {
    let question = section(user, QUESTION).unwrap_or("the question");
    match section(user, PREVIOUS_RESULT) {
        None | Some("None") => format!(
            "<think>Nothing gathered yet; one search first.</think>\
             <plan>[ ] 1 Search for {q}\n[ ] 2 Answer from the sources</plan>\
             <tool_code>{{\"name\": \"search\", \"arguments\": {{\"query\": {json}}}}}</tool_code>",
            q = question,
            json = serde_json::Value::String(question.to_string()),
        ),
        Some(result) if result.starts_with("[ok]") => {
            let evidence = result.splitn(2, ": ").nth(1).unwrap_or(result);
            format!(
                "<think>The search result answers the question.</think>\
                 <plan>[x] 1 Search for {}\n[x] 2 Answer from the sources</plan>\
                 <answer>{}</answer>",
                question, evidence
            )
        }
        Some(_) => "<think>The only lead failed.</think><stop/>".to_string(),
    }
}

fn verifier_reply() -> String {
    serde_json::json!({
        "constraints": [{"constraint": "answer is backed by a tool result", "status": "satisfied"}],
        "decision": "SUCCESS",
        "justification": "the answer restates the retrieved source",
        "trajectory_summary": "searched once and answered from the first result",
    })
    .to_string()
}

fn finalizer_reply(user: &str) -> String {
    match section(user, "Previous answer candidate:") {
        Some(candidate) if candidate != "None" => {
            format!("<answer>{}</answer><confidence>0.8</confidence>", candidate)
        }
        _ => "<answer>NONE</answer>".to_string(),
    }
}

#[async_trait]
impl LlmClient for DemoLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let system = messages
            .iter()
            .find(|m| matches!(m, Message::System(_)))
            .map(Message::content)
            .unwrap_or_default();
        let user = messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::User(_)))
            .map(Message::content)
            .unwrap_or_default();
        let content = if system.contains("strategic verifier") {
            verifier_reply()
        } else if system.contains("give the final answer") {
            finalizer_reply(user)
        } else {
            planner_reply(user)
        };
        Ok(LlmResponse {
            content,
            usage: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planner_searches_then_answers() {
        let first = planner_reply("## Question\nWhat is LangGraph?\n\n## Previous tool result\nNone\n");
        assert!(first.contains("<tool_code>"));
        assert!(first.contains("\"query\": \"What is LangGraph?\""));

        let second = planner_reply(
            "## Question\nWhat is LangGraph?\n## Previous tool result\n[ok] search: LangGraph is a library.\n",
        );
        assert!(second.contains("<answer>LangGraph is a library.</answer>"));

        let third = planner_reply("## Previous tool result\n[refused] search: refused: budget exhausted\n");
        assert!(third.contains("<stop/>"));
    }

    #[test]
    fn finalizer_repeats_candidate_or_sentinel() {
        assert!(finalizer_reply("Previous answer candidate: 42\n").contains("<answer>42</answer>"));
        assert!(finalizer_reply("Previous answer candidate: None\n").contains("NONE"));
    }
}
