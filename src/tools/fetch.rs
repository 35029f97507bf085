//! Page fetch collaborator

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::html::extract_lyrics_from_html;

/// What the `get_page_content` tool reports back to the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spanish_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_lyrics: Option<String>,
    #[serde(default)]
    pub metadata: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageContent {
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Source-language text worth caching, if the fetch produced any
    pub fn usable_lyrics(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.spanish_lyrics
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Fetches a page and extracts lyrics from it
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Never fails outright: transport errors come back as `success: false`
    async fn fetch(&self, url: &str) -> PageContent;
}

/// Plain HTTP GET with browser-like headers
pub struct HttpPageFetcher {
    client: Client,
}

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status from {}", url))?;
        response.text().await.context("Failed to read page body")
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> PageContent {
        tracing::info!("[Fetch] Getting content from URL: {}", url);
        let html = match self.get_html(url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("[Fetch] {:#}", e);
                return PageContent::failed(url, format!("{:#}", e));
            }
        };
        tracing::debug!("[Fetch] Got HTML content of length {}", html.len());

        let extracted = extract_lyrics_from_html(&html);
        tracing::info!(
            "[Fetch] Extracted Spanish lyrics: {} chars",
            extracted.spanish_lyrics.as_deref().map_or(0, str::len)
        );

        PageContent {
            url: url.to_string(),
            spanish_lyrics: extracted.spanish_lyrics,
            english_lyrics: extracted.english_lyrics,
            metadata: extracted.metadata,
            success: true,
            error: None,
        }
    }
}
