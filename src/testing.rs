//! Scripted collaborators for unit tests

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{ChatRequest, LlmProvider};
use crate::tools::{PageContent, PageFetcher, SearchResult, WebSearch};

/// Replies from two queues: one for the agent conversation and one for
/// JSON-mode vocabulary requests. An empty queue is an error.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    agent_replies: Mutex<VecDeque<String>>,
    extraction_replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_agent_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut queue) = self.agent_replies.lock() {
            queue.extend(replies.into_iter().map(Into::into));
        }
        self
    }

    pub(crate) fn with_extraction_reply(self, reply: impl Into<String>) -> Self {
        if let Ok(mut queue) = self.extraction_replies.lock() {
            queue.push_back(Ok(reply.into()));
        }
        self
    }

    pub(crate) fn with_extraction_error(self, error: impl Into<String>) -> Self {
        if let Ok(mut queue) = self.extraction_replies.lock() {
            queue.push_back(Err(error.into()));
        }
        self
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub(crate) fn agent_requests(&self) -> usize {
        self.requests().iter().filter(|r| !r.json_mode).count()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        let json_mode = request.json_mode;
        if let Ok(mut log) = self.requests.lock() {
            log.push(request);
        }

        if json_mode {
            let next = self.extraction_replies.lock().ok().and_then(|mut q| q.pop_front());
            match next {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Err(anyhow::anyhow!("no scripted extraction reply")),
            }
        } else {
            let next = self.agent_replies.lock().ok().and_then(|mut q| q.pop_front());
            next.ok_or_else(|| anyhow::anyhow!("no scripted agent reply"))
        }
    }

    fn model(&self) -> String {
        "scripted".to_string()
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

/// Returns fixed results and records queries
#[derive(Default)]
pub(crate) struct StubSearch {
    pub(crate) results: Vec<SearchResult>,
    pub(crate) queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub(crate) fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WebSearch for StubSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

/// Serves one page of lyrics for any URL
pub(crate) struct StubFetcher {
    pub(crate) spanish_lyrics: Option<String>,
}

impl StubFetcher {
    pub(crate) fn with_lyrics(lyrics: impl Into<String>) -> Self {
        Self {
            spanish_lyrics: Some(lyrics.into()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self { spanish_lyrics: None }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> PageContent {
        match &self.spanish_lyrics {
            Some(lyrics) => PageContent {
                url: url.to_string(),
                spanish_lyrics: Some(lyrics.clone()),
                english_lyrics: None,
                metadata: String::new(),
                success: true,
                error: None,
            },
            None => PageContent::failed(url, "connection refused"),
        }
    }
}
