//! Web search collaborator

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SERPAPI_BASE_URL: &str = "https://serpapi.com";

/// One organic search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Search engine used by the `search_web_serp` tool
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>>;
}

/// Google results through SerpApi
pub struct SerpApiSearch {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerpApiSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
            base_url: SERPAPI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = format!("{}/search.json", self.base_url.trim_end_matches('/'));
        let num = max_results.to_string();
        tracing::info!("[Search] Searching for: {}", query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send search request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Search API error ({}): {}", status, body);
        }

        let parsed: SerpApiResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;
        if let Some(error) = parsed.error {
            anyhow::bail!("Search API error: {}", error);
        }

        let results: Vec<SearchResult> = parsed
            .organic_results
            .into_iter()
            .filter_map(|r| {
                r.link.map(|url| SearchResult {
                    url,
                    title: r.title,
                    snippet: r.snippet,
                })
            })
            .take(max_results)
            .collect();

        tracing::info!("[Search] Found {} results", results.len());
        Ok(results)
    }
}

/// Stand-in when no search API key is configured
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>> {
        anyhow::bail!("Web search is not configured (set SERPAPI_API_KEY)")
    }
}
