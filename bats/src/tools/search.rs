//! Web search via the Exa search API.

use async_trait::async_trait;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool name; also the budget resource it consumes.
pub const TOOL_SEARCH: &str = "search";

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const DEFAULT_NUM_RESULTS: u64 = 5;
const NUM_RESULTS_MAX: u64 = 20;
const TEXT_MAX_PER_RESULT: usize = 300;

fn exa_search_url() -> String {
    std::env::var("EXA_SEARCH_URL").unwrap_or_else(|_| EXA_SEARCH_URL.to_string())
}

/// Reads an integer argument given either as a JSON number or a numeric string.
fn u64_arg(args: &serde_json::Value, key: &str) -> Option<u64> {
    let v = args.get(key)?;
    v.as_u64().or_else(|| v.as_str()?.trim().parse().ok())
}

/// Formats Exa results as numbered title / URL / snippet blocks.
fn format_results(value: &serde_json::Value) -> String {
    let results = value
        .get("results")
        .and_then(|r| r.as_array())
        .map(|v| v.as_slice())
        .unwrap_or(&[]);
    if results.is_empty() {
        return "No results found.".to_string();
    }
    let mut s = String::new();
    for (i, r) in results.iter().enumerate() {
        let title = r.get("title").and_then(|t| t.as_str()).unwrap_or("(no title)");
        let url = r.get("url").and_then(|u| u.as_str()).unwrap_or("");
        s.push_str(&format!("[{}] {}\n  URL: {}\n", i + 1, title, url));
        let highlights: Vec<&str> = r
            .get("highlights")
            .and_then(|h| h.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if !highlights.is_empty() {
            for line in highlights.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
                s.push_str(&format!("  • {}\n", line.replace('\n', " ")));
            }
        } else if let Some(text) = r.get("text").and_then(|t| t.as_str()) {
            let text = text.trim();
            if !text.is_empty() {
                let excerpt = super::truncate_text(text, TEXT_MAX_PER_RESULT);
                s.push_str(&format!("  {}\n", excerpt.replace('\n', " ")));
            }
        }
    }
    s
}

/// Web search tool (`search`). Requires an Exa API key.
///
/// Arguments: `query` (required), `num_results` (optional, 1..=20, default 5).
pub struct SearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SearchTool {
    /// Reads the key from `EXA_API_KEY`; calls fail with `InvalidInput` when unset.
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: std::env::var("EXA_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        TOOL_SEARCH
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SEARCH.to_string(),
            description: Some(
                "Search the web. Returns numbered results with title, URL and a snippet. \
                 Use precise queries; each call spends one unit of the search budget."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search query." },
                    "num_results": { "type": "string", "description": "Number of results, 1-20. Default 5." }
                },
                "required": ["query"]
            }),
            resource: Some(TOOL_SEARCH.to_string()),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing query".to_string()))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolSourceError::InvalidInput("EXA_API_KEY is not set".to_string()))?;
        let num_results = u64_arg(&args, "num_results")
            .unwrap_or(DEFAULT_NUM_RESULTS)
            .clamp(1, NUM_RESULTS_MAX);

        let body = json!({
            "query": query,
            "numResults": num_results,
            "type": "auto",
            "contents": {
                "text": { "maxCharacters": TEXT_MAX_PER_RESULT * 4 },
                "highlights": { "maxCharacters": TEXT_MAX_PER_RESULT }
            }
        });
        let res = self
            .client
            .post(exa_search_url())
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        let status = res.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            let err_body = res.text().await.unwrap_or_default();
            return Err(ToolSourceError::InvalidInput(format!(
                "Exa API error {}: {}",
                status, err_body
            )));
        }
        if !status.is_success() {
            let err_body = res.text().await.unwrap_or_default();
            return Err(ToolSourceError::Transport(format!(
                "Exa API error {}: {}",
                status, err_body
            )));
        }
        let value: serde_json::Value = res
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(e.to_string()))?;
        Ok(ToolCallContent {
            text: format_results(&value),
        })
    }
}
