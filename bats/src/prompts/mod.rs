//! Prompt templates for the planner, verifier and finalizer.
//!
//! Default text lives in `bats/prompts/*.yaml` and is embedded at compile time.
//! A directory of YAML files (`PROMPTS_DIR`) can override any of them; see [`load`].

mod load;

pub use load::{default_from_embedded, load, load_or_default, LoadError};

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// One system + user template pair.
///
/// Placeholders are written `{name}`; unknown placeholders are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub user: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Substitutes `vars` into both parts and returns `[System, User]`
    /// (the system message is omitted when empty).
    pub fn render(&self, vars: &[(&str, &str)]) -> Vec<Message> {
        let fill = |template: &str| fill_placeholders(template, vars);
        let mut messages = Vec::with_capacity(2);
        let system = fill(&self.system);
        if !system.trim().is_empty() {
            messages.push(Message::system(system.trim_end()));
        }
        messages.push(Message::user(fill(&self.user).trim_end()));
        messages
    }
}

/// Single pass, so substituted values are never scanned for placeholders again.
fn fill_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail.find('}').and_then(|close| {
            let key = &tail[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Templates for the three reasoning calls of the research loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchPrompts {
    pub think: PromptTemplate,
    pub verify: PromptTemplate,
    pub finalize: PromptTemplate,
}
