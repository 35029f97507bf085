//! Typed tool calls
//!
//! The model can request exactly five actions. Each one has a typed input,
//! built from the parser's loose argument map through `TryFrom`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::core::{AgentError, AgentResult};
use crate::parser::RawToolCall;

/// Tag for each tool in the closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Search,
    FetchPage,
    ExtractVocabulary,
    GenerateSongId,
    SaveResults,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Search,
        ToolKind::FetchPage,
        ToolKind::ExtractVocabulary,
        ToolKind::GenerateSongId,
        ToolKind::SaveResults,
    ];

    /// Resolve a tool name as written by the model, including aliases
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "search_web_serp" | "search_web" | "search" => Some(ToolKind::Search),
            "get_page_content" | "fetch_page" => Some(ToolKind::FetchPage),
            "extract_vocabulary" => Some(ToolKind::ExtractVocabulary),
            "generate_song_id" => Some(ToolKind::GenerateSongId),
            "save_results" => Some(ToolKind::SaveResults),
            _ => None,
        }
    }

    /// Name used in prompts and tool result messages
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Search => "search_web_serp",
            ToolKind::FetchPage => "get_page_content",
            ToolKind::ExtractVocabulary => "extract_vocabulary",
            ToolKind::GenerateSongId => "generate_song_id",
            ToolKind::SaveResults => "save_results",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const DEFAULT_MAX_RESULTS: usize = 5;

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

/// Accept `3`, `"3"` or nothing
fn lenient_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize).unwrap_or(DEFAULT_MAX_RESULTS),
        Value::String(s) => s.trim().parse().unwrap_or(DEFAULT_MAX_RESULTS),
        _ => DEFAULT_MAX_RESULTS,
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchInput {
    pub query: String,
    #[serde(default = "default_max_results", deserialize_with = "lenient_usize")]
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchPageInput {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractVocabularyInput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerateIdInput {
    pub artist: String,
    pub title: String,
}

/// Lyrics as plain text or as a fetch-style object
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsInput {
    Text(String),
    Structured(Map<String, Value>),
}

impl LyricsInput {
    /// Key holding the source-language text in a structured value
    pub const SOURCE_KEY: &'static str = "spanish_lyrics";

    pub fn text(&self) -> &str {
        match self {
            LyricsInput::Text(text) => text,
            LyricsInput::Structured(map) => map
                .get(Self::SOURCE_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default(),
        }
    }

    /// Length in characters of the usable text
    pub fn char_len(&self) -> usize {
        self.text().chars().count()
    }
}

impl From<Value> for LyricsInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => LyricsInput::Text(text),
            Value::Object(map) => LyricsInput::Structured(map),
            Value::Null => LyricsInput::Text(String::new()),
            other => LyricsInput::Text(other.to_string()),
        }
    }
}

impl From<&str> for LyricsInput {
    fn from(text: &str) -> Self {
        LyricsInput::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveResultsInput {
    pub song_id: String,
    pub lyrics: LyricsInput,
    /// Items as the model wrote them; normalised when saved
    pub vocabulary: Vec<Value>,
}

/// A validated request for one tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Search(SearchInput),
    FetchPage(FetchPageInput),
    ExtractVocabulary(ExtractVocabularyInput),
    GenerateId(GenerateIdInput),
    SaveResults(SaveResultsInput),
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::Search(_) => ToolKind::Search,
            ToolCall::FetchPage(_) => ToolKind::FetchPage,
            ToolCall::ExtractVocabulary(_) => ToolKind::ExtractVocabulary,
            ToolCall::GenerateId(_) => ToolKind::GenerateSongId,
            ToolCall::SaveResults(_) => ToolKind::SaveResults,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(
    args: Map<String, Value>,
    kind: ToolKind,
) -> AgentResult<T> {
    serde_json::from_value::<T>(Value::Object(stringify_scalars(args)))
        .map_err(|e| AgentError::invalid_arguments(kind.name(), e.to_string()))
}

/// Bare numbers and booleans where text is expected
fn stringify_scalars(args: Map<String, Value>) -> Map<String, Value> {
    args.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Bool(b) if key != "max_results" => Value::String(b.to_string()),
                Value::Number(n) if key != "max_results" => Value::String(n.to_string()),
                other => other,
            };
            (key, value)
        })
        .collect()
}

fn vocabulary_items(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(Value::Object(item)) => vec![Value::Object(item)],
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Vec<Value>>(trimmed) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("[Tools] Ignoring unparseable vocabulary argument: {}", e);
                    Vec::new()
                }
            }
        }
        Some(other) => {
            tracing::warn!("[Tools] Ignoring vocabulary argument of unexpected type: {}", other);
            Vec::new()
        }
    }
}

impl TryFrom<RawToolCall> for ToolCall {
    type Error = AgentError;

    fn try_from(raw: RawToolCall) -> Result<Self, Self::Error> {
        let kind =
            ToolKind::from_name(&raw.name).ok_or_else(|| AgentError::UnknownTool(raw.name.clone()))?;
        let mut args = raw.arguments;

        match kind {
            ToolKind::Search => {
                let input = parse_args::<SearchInput>(args, kind)?;
                if input.query.trim().is_empty() {
                    return Err(AgentError::invalid_arguments(kind.name(), "query is empty"));
                }
                Ok(ToolCall::Search(input))
            }
            ToolKind::FetchPage => {
                let mut input = parse_args::<FetchPageInput>(args, kind)?;
                input.url = input.url.trim().to_string();
                if input.url.is_empty() {
                    return Err(AgentError::invalid_arguments(kind.name(), "url is empty"));
                }
                Ok(ToolCall::FetchPage(input))
            }
            ToolKind::ExtractVocabulary => {
                parse_args::<ExtractVocabularyInput>(args, kind).map(ToolCall::ExtractVocabulary)
            }
            ToolKind::GenerateSongId => {
                parse_args::<GenerateIdInput>(args, kind).map(ToolCall::GenerateId)
            }
            ToolKind::SaveResults => {
                let song_id = match args.remove("song_id") {
                    Some(Value::String(id)) => id,
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let lyrics = args.remove("lyrics").map(LyricsInput::from).unwrap_or_else(|| {
                    LyricsInput::Text(String::new())
                });
                let vocabulary = vocabulary_items(args.remove("vocabulary"));
                Ok(ToolCall::SaveResults(SaveResultsInput {
                    song_id,
                    lyrics,
                    vocabulary,
                }))
            }
        }
    }
}

/// Result of a tool invocation, sent back to the model as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Search(Vec<super::search::SearchResult>),
    Page(super::fetch::PageContent),
    Vocabulary(Vec<super::vocabulary::VocabularyItem>),
    SongId(String),
    Saved { song_id: String },
}

impl ToolOutput {
    /// Serialize for the conversation
    pub fn to_json(&self) -> AgentResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ToolCallParser;
    use serde_json::json;

    fn call(reply: &str) -> AgentResult<ToolCall> {
        let raw = ToolCallParser::new().parse(reply).expect("tool call");
        ToolCall::try_from(raw)
    }

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(ToolKind::from_name("search_web"), Some(ToolKind::Search));
        assert_eq!(ToolKind::from_name("fetch_page"), Some(ToolKind::FetchPage));
        assert_eq!(ToolKind::from_name("delete_everything"), None);
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_search_defaults_and_lenient_count() {
        let ToolCall::Search(input) = call("Tool: search(query=\"a b\")").unwrap() else {
            panic!("expected search");
        };
        assert_eq!(input.max_results, DEFAULT_MAX_RESULTS);

        let ToolCall::Search(input) =
            call("Tool: search_web_serp(query=\"a\", max_results=\"3\")").unwrap()
        else {
            panic!("expected search");
        };
        assert_eq!(input.max_results, 3);
    }

    #[test]
    fn test_missing_required_argument() {
        let err = call("Tool: generate_song_id(artist=\"Shakira\")").unwrap_err();
        assert!(matches!(err, AgentError::InvalidToolArguments { ref tool, .. } if tool == "generate_song_id"));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_unknown_tool() {
        let err = call("Tool: dance(style=\"salsa\")").unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(ref name) if name == "dance"));
    }

    #[test]
    fn test_numbers_become_text() {
        let ToolCall::GenerateId(input) = call("Tool: generate_song_id(artist=Blink, title=182)").unwrap()
        else {
            panic!("expected generate id");
        };
        assert_eq!(input.title, "182");
    }

    #[test]
    fn test_save_results_shapes() {
        let ToolCall::SaveResults(input) = call(
            r#"Tool: save_results(song_id="x", lyrics={"spanish_lyrics": "hola"}, vocabulary="[{\"spanish\": \"hola\"}]")"#,
        )
        .unwrap() else {
            panic!("expected save");
        };
        assert_eq!(input.lyrics.text(), "hola");
        assert_eq!(input.vocabulary, vec![json!({"spanish": "hola"})]);
    }

    #[test]
    fn test_lyrics_input_conversions() {
        assert_eq!(LyricsInput::from(Value::Null).text(), "");
        assert_eq!(LyricsInput::from(json!({"english_lyrics": "hi"})).text(), "");
        assert_eq!(LyricsInput::from("añoranza").char_len(), 8);
    }
}
