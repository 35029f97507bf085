pub mod openai;
pub mod provider;
pub mod rate_limit;
pub mod types;

pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use rate_limit::RateLimiter;
pub use types::{ChatRequest, CompletionRequest, CompletionResponse, ResponseFormat, Usage};
