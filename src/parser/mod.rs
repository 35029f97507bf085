//! Tool call parsing
//!
//! The model replies in free text and requests a tool with a line such as
//!
//! ```text
//! Tool: save_results(song_id="despacito", lyrics="...", vocabulary=[...])
//! ```
//!
//! Parsing runs in two tiers. The generic grammar in [`grammar`] handles
//! quoted strings, JSON literals and bare tokens for any tool name. The
//! per-tool table in [`schema`] then repairs what models commonly get
//! wrong: unescaped quotes inside lyrics, truncated replies, positional
//! arguments and missing required fields.

mod grammar;
mod schema;

pub use grammar::TOOL_MARKER;
pub use schema::{ArgDefault, ArgSchema, UNKNOWN_SONG_ID};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolKind;

/// Tool name and loosely typed arguments as written by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    /// Arguments filled from defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defaulted: Vec<String>,
}

impl RawToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
            defaulted: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }
}

/// Parser for `Tool: name(...)` requests in model replies
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallParser;

impl ToolCallParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the first tool call in `reply`, if any
    pub fn parse(&self, reply: &str) -> Option<RawToolCall> {
        let (name, args_start) = grammar::find_call(reply)?;
        let src = &reply[args_start..];
        let parsed = grammar::parse_arguments(src);

        let mut arguments = parsed.named;
        let mut defaulted = Vec::new();

        match ToolKind::from_name(name) {
            Some(kind) => {
                defaulted = schema::apply(kind, src, parsed.positional, &mut arguments);
            }
            None => {
                if let Some(value) = parsed.positional {
                    arguments.entry("input".to_string()).or_insert(value);
                }
            }
        }

        if !parsed.closed {
            tracing::debug!("[Parser] Tool call '{}' has no closing parenthesis", name);
        }

        tracing::debug!(
            "[Parser] Parsed tool call '{}' with arguments: {:?}",
            name,
            arguments.keys().collect::<Vec<_>>()
        );

        Some(RawToolCall {
            name: name.to_string(),
            arguments,
            defaulted,
        })
    }
}
