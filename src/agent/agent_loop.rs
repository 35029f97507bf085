//! Song vocabulary agent loop
//!
//! One run is a bounded dialogue:
//! - model reply → completion marker? → resolve song id and stop
//! - otherwise parse a tool call → execute → feed the JSON result back
//! - recoverable failures become a corrective user message and cost a turn

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::core::{AgentError, AgentResult, AgentState};
use crate::llm::{ChatRequest, LlmProvider};
use crate::parser::ToolCallParser;
use crate::tools::{LyricsInput, ToolCall, ToolKind, ToolOutput, ToolRegistry};

use super::completion::{is_completion, resolve_song_id};
use super::config::{DEFAULT_MAX_TURNS, DEFAULT_TEMPERATURE};
use super::system_prompt::system_prompt;

/// Call syntax the model is reminded of after a reply without a tool call
pub const TOOL_CALL_FORMAT: &str = r#"Tool: tool_name(arg1="value1", arg2="value2")"#;

/// Per-run state kept outside the conversation
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub turn: usize,
    pub max_turns: usize,
    pub state: AgentState,

    /// Source-language text from the last successful fetch.
    /// Written on fetch, cleared once a save succeeds.
    pub cached_extracted_text: Option<String>,

    /// Last fetched text, kept for the service's recovery path
    pub last_fetched_text: Option<String>,
}

impl RunContext {
    pub fn new(max_turns: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            turn: 0,
            max_turns,
            state: AgentState::default(),
            cached_extracted_text: None,
            last_fetched_text: None,
        }
    }

    fn remember_fetch(&mut self, text: &str) {
        tracing::info!("[Agent] Cached {} chars of fetched lyrics", text.chars().count());
        self.cached_extracted_text = Some(text.to_string());
        self.last_fetched_text = Some(text.to_string());
    }

    /// Swap truncated save lyrics for the cached fetch text
    fn apply_cached_lyrics(&self, call: &mut ToolCall) {
        let ToolCall::SaveResults(input) = call else {
            return;
        };
        if let Some(cached) = &self.cached_extracted_text {
            let cached_len = cached.chars().count();
            let supplied_len = input.lyrics.char_len();
            if cached_len > supplied_len {
                tracing::info!(
                    "[Agent] Using cached lyrics ({} chars) instead of supplied lyrics ({} chars)",
                    cached_len,
                    supplied_len
                );
                input.lyrics = LyricsInput::Text(cached.clone());
            }
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResponse {
    pub song_id: String,

    #[serde(skip)]
    pub cached_lyrics: Option<String>,
}

enum TurnOutcome {
    NoToolCall,
    Executed { tool: &'static str, result: String },
}

/// Drives the model through the tool set until it announces completion
pub struct SongVocabAgent {
    llm: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    parser: ToolCallParser,
    system_prompt: String,
    temperature: f32,
}

impl SongVocabAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: ToolRegistry) -> Self {
        Self {
            llm,
            tools,
            parser: ToolCallParser::new(),
            system_prompt: system_prompt(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the loop with the default turn budget
    pub async fn run(&self, message: &str) -> AgentResult<ProcessResponse> {
        self.process_request(message, DEFAULT_MAX_TURNS).await
    }

    /// Run one request to completion or failure
    pub async fn process_request(&self, message: &str, max_turns: usize) -> AgentResult<ProcessResponse> {
        let mut ctx = RunContext::new(max_turns);
        let span = tracing::info_span!("agent_run", run_id = %ctx.run_id);

        async {
            tracing::info!("[Agent] Starting run for: {}", message);
            let result = self.run_turns(&mut ctx, message).await;
            match &result {
                Ok(response) => tracing::info!("[Agent] Completed with song_id {}", response.song_id),
                Err(e) => tracing::error!("[Agent] Run failed: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_turns(&self, ctx: &mut RunContext, message: &str) -> AgentResult<ProcessResponse> {
        let mut conversation = Conversation::seeded(self.system_prompt.as_str(), message);

        while ctx.turn < ctx.max_turns {
            ctx.state = AgentState::AwaitingModel;
            tracing::info!("[Agent] Turn {}/{}", ctx.turn + 1, ctx.max_turns);

            let request = ChatRequest::new(conversation.messages().to_vec()).with_temperature(self.temperature);
            let reply = match self.llm.chat(request).await {
                Ok(reply) => reply,
                Err(e) => {
                    let err = AgentError::Llm(format!("{:#}", e));
                    tracing::warn!("[Agent] {}", err);
                    conversation.add_user_message(error_message(&err));
                    ctx.turn += 1;
                    continue;
                }
            };
            tracing::debug!("[Agent] Model reply ({} chars): {}", reply.len(), reply);

            if is_completion(&reply) {
                return match resolve_song_id(&reply, self.tools.store()) {
                    Ok(song_id) => {
                        ctx.state = AgentState::completed(song_id.as_str());
                        Ok(ProcessResponse {
                            song_id,
                            cached_lyrics: ctx.last_fetched_text.take(),
                        })
                    }
                    Err(e) => {
                        ctx.state = AgentState::failed(e.to_string());
                        Err(e)
                    }
                };
            }

            conversation.add_assistant_message(reply.as_str());
            match self.run_tool_turn(ctx, &reply).await {
                Ok(TurnOutcome::NoToolCall) => {
                    tracing::warn!("[Agent] No tool call found in reply");
                    conversation.add_user_message(format!(
                        "Please use one of the available tools to proceed. Format your response as {}",
                        TOOL_CALL_FORMAT
                    ));
                }
                Ok(TurnOutcome::Executed { tool, result }) => {
                    conversation.add_user_message(format!("Tool {} result: {}", tool, result));
                }
                Err(e) => {
                    tracing::warn!("[Agent] Turn error: {}", e);
                    conversation.add_user_message(error_message(&e));
                }
            }
            ctx.turn += 1;
        }

        let err = AgentError::MaxTurnsExceeded(ctx.max_turns);
        ctx.state = AgentState::failed(err.to_string());
        Err(err)
    }

    async fn run_tool_turn(&self, ctx: &mut RunContext, reply: &str) -> AgentResult<TurnOutcome> {
        let Some(raw) = self.parser.parse(reply) else {
            return Ok(TurnOutcome::NoToolCall);
        };
        let mut call = ToolCall::try_from(raw)?;
        ctx.state = AgentState::tool_call(call.name());

        ctx.apply_cached_lyrics(&mut call);
        let output = self.tools.execute(&call).await?;

        match &output {
            ToolOutput::Page(page) => {
                if let Some(text) = page.usable_lyrics() {
                    ctx.remember_fetch(text);
                }
            }
            ToolOutput::Saved { .. } => ctx.cached_extracted_text = None,
            _ => {}
        }

        Ok(TurnOutcome::Executed {
            tool: call.name(),
            result: output.to_json()?,
        })
    }
}

/// Corrective message fed back to the model after a failed turn
fn error_message(err: &AgentError) -> String {
    let detail = match err {
        AgentError::InvalidToolArguments { tool, .. } if tool == ToolKind::ExtractVocabulary.name() => {
            "There was an error extracting vocabulary. Please try with a shorter text or different approach"
                .to_string()
        }
        AgentError::UnknownTool(_) | AgentError::InvalidToolArguments { .. } => format!(
            "{}. I couldn't understand your tool call. Please format it exactly as: {}",
            err, TOOL_CALL_FORMAT
        ),
        other => other.to_string(),
    };
    format!("Error: {}. Please try again.", detail)
}
