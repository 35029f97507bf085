//! The song vocabulary agent
//!
//! - `agent_loop` - [`SongVocabAgent`], the bounded tool-calling loop
//! - `completion` - completion marker and song id recovery
//! - `config` - [`AgentConfig`] from the environment
//! - `system_prompt` - tool-call convention given to the model

pub mod agent_loop;
pub mod completion;
pub mod config;
pub mod system_prompt;

pub use agent_loop::{ProcessResponse, RunContext, SongVocabAgent, TOOL_CALL_FORMAT};
pub use completion::{is_completion, resolve_song_id, COMPLETION_MARKER};
pub use config::{AgentConfig, DEFAULT_MAX_TURNS, DEFAULT_TEMPERATURE};
pub use system_prompt::system_prompt;
