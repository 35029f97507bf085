//! Agent loop state

use serde::{Deserialize, Serialize};

/// State of one agent run
///
/// Every non-terminal turn returns to `AwaitingModel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentState {
    /// Waiting for the next assistant message
    AwaitingModel,

    /// A tool call was parsed and is being executed
    HaveToolCall {
        /// Name of the tool being executed
        tool_name: String,
    },

    /// The model announced completion and a song id was resolved
    HaveCompletion {
        /// Resolved song id
        song_id: String,
    },

    /// Turn budget exhausted or fatal parse failure
    Failed {
        /// Error message
        message: String,
    },
}

impl AgentState {
    /// Check if the run is over (HaveCompletion or Failed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentState::HaveCompletion { .. } | AgentState::Failed { .. }
        )
    }

    /// Create a failed state
    pub fn failed(msg: impl Into<String>) -> Self {
        AgentState::Failed {
            message: msg.into(),
        }
    }

    /// Create a tool call state
    pub fn tool_call(name: impl Into<String>) -> Self {
        AgentState::HaveToolCall {
            tool_name: name.into(),
        }
    }

    /// Create a completion state
    pub fn completed(song_id: impl Into<String>) -> Self {
        AgentState::HaveCompletion {
            song_id: song_id.into(),
        }
    }
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState::AwaitingModel
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentState::AwaitingModel => write!(f, "Awaiting model"),
            AgentState::HaveToolCall { tool_name } => write!(f, "Executing tool: {}", tool_name),
            AgentState::HaveCompletion { song_id } => write!(f, "Completed: {}", song_id),
            AgentState::Failed { message } => write!(f, "Failed: {}", message),
        }
    }
}
