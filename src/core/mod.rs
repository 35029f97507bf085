//! Core types for the song vocabulary agent
//!
//! - `AgentState` - State machine of one agent run
//! - `AgentError` - Error types

pub mod error;
pub mod state;

pub use error::{AgentError, AgentResult, ErrorResponse};
pub use state::AgentState;
