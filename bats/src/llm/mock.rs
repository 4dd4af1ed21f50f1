//! Scripted LLM for tests and offline runs.
//!
//! Replies are served in order; the last one repeats once the script runs out.
//! A scripted `Err` makes that call fail with `AgentError::ExecutionFailed`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage};
use crate::message::Message;

pub struct MockLlm {
    script: Vec<Result<String, String>>,
    call_count: AtomicUsize,
    usage: Option<LlmUsage>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl MockLlm {
    fn from_script(script: Vec<Result<String, String>>) -> Self {
        Self {
            script,
            call_count: AtomicUsize::new(0),
            usage: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self::from_script(vec![Ok(content.into())])
    }

    /// Replies with each entry in turn, then repeats the last one.
    pub fn scripted<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::from_script(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Mixed script of replies and failures.
    pub fn with_results(script: Vec<Result<String, String>>) -> Self {
        Self::from_script(script)
    }

    /// Every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_script(vec![Err(message.into())])
    }

    /// Reports this usage on every successful call.
    pub fn with_usage(mut self, usage: LlmUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Messages of every call so far, oldest first.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut p) = self.prompts.lock() {
            p.push(messages.to_vec());
        }
        let entry = self
            .script
            .get(n)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        match entry {
            Ok(content) => Ok(LlmResponse {
                content,
                usage: self.usage.clone(),
            }),
            Err(e) => Err(AgentError::ExecutionFailed(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_then_repeat_last() {
        let llm = MockLlm::scripted(["a", "b"]);
        let m = [Message::user("q")];
        assert_eq!(llm.invoke(&m).await.unwrap().content, "a");
        assert_eq!(llm.invoke(&m).await.unwrap().content, "b");
        assert_eq!(llm.invoke(&m).await.unwrap().content, "b");
        assert_eq!(llm.call_count(), 3);
        assert_eq!(llm.prompts().len(), 3);
    }

    #[tokio::test]
    async fn failing_mock_returns_execution_failed() {
        let llm = MockLlm::failing("down");
        let err = llm.invoke(&[]).await.unwrap_err();
        assert!(err.to_string().contains("down"));
    }

    #[tokio::test]
    async fn with_results_mixes_errors_and_replies() {
        let llm = MockLlm::with_results(vec![Err("flaky".into()), Ok("fine".into())]);
        assert!(llm.invoke(&[]).await.is_err());
        assert_eq!(llm.invoke(&[]).await.unwrap().content, "fine");
    }
}
