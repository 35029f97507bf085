//! Chat completions API types
//!
//! These types serialize/deserialize with OpenAI-compatible `/chat/completions`
//! endpoints.

use serde::{Deserialize, Serialize};

use crate::conversation::Message;

// ============================================================================
// Provider-facing request
// ============================================================================

/// A chat request as seen by the agent
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Ordered conversation, system prompt first
    pub messages: Vec<Message>,

    /// Sampling temperature (provider default when `None`)
    pub temperature: Option<f32>,

    /// Constrain the reply to a JSON object
    pub json_mode: bool,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a request from a message list
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Create a request holding a single user prompt
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask for a JSON object reply
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Set the max tokens for the reply
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Rough token estimate (four characters per token)
    pub fn estimated_tokens(&self) -> u32 {
        let chars: usize = self.messages.iter().map(|m| m.content.len()).sum();
        (chars / 4).max(1) as u32
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Response format constraint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFormat {
    /// "json_object" or "text"
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// Request body for the chat completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// The model to use
    pub model: String,

    /// Input messages
    pub messages: Vec<Message>,

    /// Temperature for sampling (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Structured output constraint (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl CompletionRequest {
    /// Build the wire request for a model
    pub fn from_chat(model: impl Into<String>, request: ChatRequest) -> Self {
        Self {
            model: model.into(),
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then(ResponseFormat::json_object),
        }
    }
}

/// Response from the chat completions endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// Unique response identifier
    #[serde(default)]
    pub id: Option<String>,

    /// Model that produced the reply
    #[serde(default)]
    pub model: Option<String>,

    /// Generated choices
    pub choices: Vec<Choice>,

    /// Token usage
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl CompletionResponse {
    /// Text content of the first choice
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

/// One generated choice
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a choice; content is null for refusals and tool calls
#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_request_serialization() {
        let chat = ChatRequest::prompt("hola")
            .with_temperature(0.3)
            .with_json_mode();
        let request = CompletionRequest::from_chat("gpt-4o", chat);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(
            value["messages"],
            json!([{"role": "user", "content": "hola"}])
        );
        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        let temperature = value["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_completion_request_omits_optional_fields() {
        let request = CompletionRequest::from_chat("m", ChatRequest::prompt("x"));
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("temperature").is_none());
        assert!(value.get("response_format").is_none());
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn test_completion_response_text() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "FINISHED"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }))
        .unwrap();

        assert_eq!(response.text(), Some("FINISHED"));
        assert_eq!(response.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn test_estimated_tokens() {
        let request = ChatRequest::prompt("a".repeat(400));
        assert_eq!(request.estimated_tokens(), 100);
        assert_eq!(ChatRequest::prompt("").estimated_tokens(), 1);
    }
}
