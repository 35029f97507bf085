//! LLM Provider trait
//!
//! Abstracts the chat interface so the agent loop and the vocabulary
//! extractor are independent of the model vendor.

use anyhow::Result;

use super::types::ChatRequest;

/// Trait for chat-style language model providers.
///
/// A provider takes an ordered message list and returns the content of one
/// assistant message. Model identity and temperature are configuration.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat request and return the assistant's text reply.
    async fn chat(&self, request: ChatRequest) -> Result<String>;

    /// Get the current model name.
    fn model(&self) -> String;

    /// Get the provider name (e.g., "openai").
    fn provider_name(&self) -> &str;
}
