//! OpenAI-compatible chat completions client
//!
//! Works against api.openai.com, Azure OpenAI deployments behind a proxy, and
//! local servers that speak the same `/chat/completions` protocol.
//!
//! ```ignore
//! // From environment variables
//! let llm = OpenAiProvider::from_env()?;
//!
//! // With explicit API key
//! let llm = OpenAiProvider::new("sk-...").with_model("gpt-4o-mini");
//! ```

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::provider::LlmProvider;
use super::rate_limit::RateLimiter;
use super::types::{ChatRequest, CompletionRequest, CompletionResponse};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Chat completions provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    rate_limiter: Option<Arc<Mutex<RateLimiter>>>,
}

impl OpenAiProvider {
    /// Create a new provider from environment variables
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` (required)
    /// - `MODEL_NAME` (optional, defaults to gpt-4o)
    /// - `OPENAI_BASE_URL` (optional)
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating OpenAI provider from environment");

        let api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable not set")?;
        let model = env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_base = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        tracing::info!("Using model: {}", model);

        Ok(Self::new(api_key).with_model(model).with_api_base(api_base))
    }

    /// Create a new provider with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            rate_limiter: None,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL (no trailing `/chat/completions`)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Throttle requests through a rate limiter
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(Arc::new(Mutex::new(limiter)));
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = self.completions_url();

        tracing::debug!(
            "[OpenAI] POST {} ({} messages)",
            url,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to chat completions API")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read chat completions response body")?;

        tracing::debug!("[OpenAI] Response status: {}", status);
        tracing::trace!("[OpenAI] Response body: {}", response_text);

        if !status.is_success() {
            tracing::error!("[OpenAI] API error: {} - {}", status, response_text);
            anyhow::bail!("Chat completions API error ({}): {}", status, response_text);
        }

        serde_json::from_str(&response_text).context("Failed to parse chat completions response")
    }
}

// Keys never end up in logs.
impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("rate_limited", &self.rate_limiter.is_some())
            .finish()
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<String> {
        if let Some(limiter) = &self.rate_limiter {
            let estimated = request.estimated_tokens();
            limiter.lock().await.check_and_wait(estimated).await;
        }

        let wire = CompletionRequest::from_chat(&self.model, request);
        let response = self.send_request(&wire).await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "[OpenAI] Usage: prompt={} completion={}",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        let text = response
            .text()
            .context("Chat completions response contained no message content")?;

        tracing::info!("[OpenAI] Received reply, length: {} chars", text.len());

        Ok(text.to_string())
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        })
    }

    #[tokio::test]
    async fn test_chat_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test_api_key"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                "Tool: search_web_serp(query=\"despacito letra\")",
            )))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test_api_key")
            .with_model("gpt-4o-mini")
            .with_api_base(format!("{}/v1", server.uri()));

        let reply = provider.chat(ChatRequest::prompt("hola")).await.unwrap();
        assert_eq!(reply, "Tool: search_web_serp(query=\"despacito letra\")");
    }

    #[tokio::test]
    async fn test_json_mode_sets_response_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(
                json!({"response_format": {"type": "json_object"}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("k").with_api_base(server.uri());
        let reply = provider
            .chat(ChatRequest::prompt("extract").with_json_mode())
            .await
            .unwrap();
        assert_eq!(reply, "{}");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("k").with_api_base(server.uri());
        let err = provider.chat(ChatRequest::prompt("x")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"), "unexpected error: {}", message);
        assert!(message.contains("slow down"));
    }

    #[tokio::test]
    async fn test_null_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("k").with_api_base(server.uri());
        assert!(provider.chat(ChatRequest::prompt("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_trailing_slash_in_api_base() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/proxy/chat/completions"))
            .and(header("authorization", "Bearer proxy-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("proxy-key").with_api_base(format!("{}/proxy/", server.uri()));
        assert_eq!(provider.chat(ChatRequest::prompt("x")).await.unwrap(), "ok");
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", OpenAiProvider::new("sk-secret").with_model("gpt-4o-mini"));
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("gpt-4o-mini"));
    }
}
