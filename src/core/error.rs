//! Agent error types

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while running the song vocabulary agent
#[derive(Error, Debug)]
pub enum AgentError {
    /// The turn budget ran out before the model announced completion
    #[error("Reached maximum number of turns ({0}) without completing the task")]
    MaxTurnsExceeded(usize),

    /// Completion marker seen but no song id could be recovered
    #[error("No song_id found in completed response")]
    MissingSongId,

    /// Tool name not in the closed tool set
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments could not be converted to the tool's input type
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },

    /// Tool execution error
    #[error("Tool error: {0}")]
    Tool(String),

    /// Language model call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request could not be turned into a song
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Artifact files missing and not recoverable
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        AgentError::Other(msg.into())
    }

    /// Create a tool error
    pub fn tool_error(msg: impl Into<String>) -> Self {
        AgentError::Tool(msg.into())
    }

    /// Create an argument error for a tool
    pub fn invalid_arguments(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        AgentError::InvalidToolArguments {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// HTTP status an outer request layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            AgentError::InvalidRequest(_) => 400,
            AgentError::ArtifactNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Human-readable response body for the request layer
    pub fn to_response(&self) -> ErrorResponse {
        let detail = match self {
            AgentError::InvalidRequest(msg) | AgentError::ArtifactNotFound(msg) => msg.clone(),
            other => format!("Error processing request: {}", other),
        };
        ErrorResponse { detail }
    }
}

/// Error body returned to callers of the request layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;
