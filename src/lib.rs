pub mod core;
pub mod conversation;
pub mod parser;
pub mod storage;
pub mod tools;

// Chat completions provider
pub mod llm;

// Tool-calling agent loop
pub mod agent;

// Request handling around the agent
pub mod service;

pub mod logging;

#[cfg(test)]
mod testing;

pub use agent::{AgentConfig, ProcessResponse, SongVocabAgent};
pub use core::{AgentError, AgentResult, ErrorResponse};
pub use service::SongVocabService;
pub use storage::{ArtifactStore, SongArtifact};
