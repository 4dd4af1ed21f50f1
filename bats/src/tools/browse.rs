//! Page fetch plus plain-text extraction.

use async_trait::async_trait;
use scraper::Html;
use serde_json::json;

use crate::tool_source::{ToolCallContent, ToolSourceError, ToolSpec};
use crate::tools::Tool;

/// Tool name; also the budget resource it consumes.
pub const TOOL_BROWSE: &str = "browse";

/// Characters of page text returned when no limit is configured.
pub const DEFAULT_BROWSE_MAX_CHARS: usize = 500;

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Visible text of an HTML document: entities decoded, scripts and styles
/// dropped, whitespace collapsed to single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// Cuts `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Fetches a URL with GET and returns its visible text (`browse`).
///
/// Arguments: `url` (required), `goal` (optional; echoed as context so the
/// planner can tell why the page was read).
pub struct BrowseTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl Default for BrowseTool {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowseTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_chars: DEFAULT_BROWSE_MAX_CHARS,
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_chars: DEFAULT_BROWSE_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    fn format(&self, url: &str, goal: Option<&str>, body: &str, is_html: bool) -> String {
        let text = if is_html {
            html_to_text(body)
        } else {
            body.split_whitespace().collect::<Vec<_>>().join(" ")
        };
        let text = truncate_text(&text, self.max_chars);
        match goal {
            Some(g) => format!("Page {} (goal: {}):\n{}", url, g, text),
            None => format!("Page {}:\n{}", url, text),
        }
    }
}

#[async_trait]
impl Tool for BrowseTool {
    fn name(&self) -> &str {
        TOOL_BROWSE
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_BROWSE.to_string(),
            description: Some(
                "Fetch a web page and return its visible text, truncated. Use on URLs found by \
                 search; each call spends one unit of the browse budget."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "HTTP or HTTPS URL to read." },
                    "goal": { "type": "string", "description": "What to look for on the page." }
                },
                "required": ["url"]
            }),
            resource: Some(TOOL_BROWSE.to_string()),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<ToolCallContent, ToolSourceError> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing url".to_string()))?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolSourceError::InvalidInput(format!(
                "url must start with http:// or https://: {}",
                url
            )));
        }
        let goal = args
            .get("goal")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|g| !g.is_empty());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("request failed: {}", e)))?;
        let status = response.status();
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ToolSourceError::InvalidInput(format!(
                "HTTP {} for {}",
                status, url
            )));
        }
        if !status.is_success() {
            return Err(ToolSourceError::Transport(format!("HTTP {} for {}", status, url)));
        }
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);
        let body = response
            .text()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("failed to read body: {}", e)))?;
        Ok(ToolCallContent {
            text: self.format(url, goal, &body, is_html),
        })
    }
}
