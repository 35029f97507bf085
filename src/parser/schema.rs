//! Per-tool argument overrides
//!
//! The generic grammar handles well-formed calls. The table here covers what
//! it cannot: a positional first argument, greedy free-text fields that may
//! contain unescaped quotes, arguments found outside the parsed region, and
//! defaults for required fields the model left out.

use regex::Regex;
use serde_json::{Map, Value};
use std::ops::Range;

use super::grammar::{parse_value, Cursor};
use crate::tools::ToolKind;

/// Fallback for a missing argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgDefault {
    Text(&'static str),
    EmptyList,
}

impl ArgDefault {
    fn to_value(self) -> Value {
        match self {
            ArgDefault::Text(text) => Value::String(text.to_string()),
            ArgDefault::EmptyList => Value::Array(Vec::new()),
        }
    }
}

/// Argument schema for a known tool
#[derive(Debug, Clone, Copy)]
pub struct ArgSchema {
    /// Argument receiving an unnamed first value
    pub positional: Option<&'static str>,
    /// Argument extracted greedily as free text
    pub free_text: Option<&'static str>,
    /// Arguments searched anywhere in the call when the grammar missed them
    pub fields: &'static [&'static str],
    /// Fallbacks for arguments still missing
    pub defaults: &'static [(&'static str, ArgDefault)],
}

pub const UNKNOWN_SONG_ID: &str = "unknown-song";

impl ArgSchema {
    pub fn for_tool(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Search => Self {
                positional: Some("query"),
                free_text: None,
                fields: &["query", "max_results"],
                defaults: &[],
            },
            ToolKind::FetchPage => Self {
                positional: Some("url"),
                free_text: None,
                fields: &["url"],
                defaults: &[],
            },
            ToolKind::ExtractVocabulary => Self {
                positional: Some("text"),
                free_text: Some("text"),
                fields: &[],
                defaults: &[],
            },
            ToolKind::GenerateSongId => Self {
                positional: None,
                free_text: None,
                fields: &["artist", "title"],
                defaults: &[],
            },
            ToolKind::SaveResults => Self {
                positional: None,
                free_text: Some("lyrics"),
                fields: &["song_id", "vocabulary"],
                defaults: &[
                    ("song_id", ArgDefault::Text(UNKNOWN_SONG_ID)),
                    ("lyrics", ArgDefault::Text("")),
                    ("vocabulary", ArgDefault::EmptyList),
                ],
            },
        }
    }
}

/// Greedily extracted free-text value
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FreeText {
    pub value: String,
    pub truncated: bool,
    /// Byte range of the value in the argument source
    pub span: Range<usize>,
}

fn assignment_regex(field: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?:^|[\s,(]){}\s*=\s*", regex::escape(field))).ok()
}

/// Extract `field="..."` where the value may contain unescaped quotes.
///
/// The value ends at the first quote followed by `, <sibling>=`, where
/// `sibling` is one of the tool's other argument names; failing that, the
/// last quote followed by `)` or end of input; failing that, the rest of the
/// input is taken and the value is marked truncated. Returns `None` when the
/// field is absent or holds a structured literal.
pub(crate) fn extract_free_text(src: &str, field: &str, siblings: &[&str]) -> Option<FreeText> {
    let assignment = assignment_regex(field)?;
    let start = assignment.find(src)?.end();
    let body = &src[start..];

    let quote = match body.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        Some('{') | Some('[') => return None,
        _ => return Some(unquoted_free_text(src, start)),
    };

    let next_arg = sibling_regex(siblings);
    let value_start = start + 1;
    let mut before_arg: Option<usize> = None;
    let mut before_close: Option<usize> = None;

    for (offset, c) in src[value_start..].char_indices() {
        if c != quote {
            continue;
        }
        let idx = value_start + offset;
        let tail = &src[idx + 1..];
        if next_arg.as_ref().is_some_and(|re| re.is_match(tail)) {
            before_arg = Some(idx);
            break;
        } else {
            let trimmed = tail.trim_start();
            if trimmed.is_empty() || trimmed.starts_with(')') {
                before_close = Some(idx);
            }
        }
    }

    match before_arg.or(before_close) {
        Some(end) => Some(FreeText {
            value: src[value_start..end].to_string(),
            truncated: false,
            span: value_start..end,
        }),
        None => {
            let value = src[value_start..].trim_end();
            Some(FreeText {
                value: value.to_string(),
                truncated: true,
                span: value_start..value_start + value.len(),
            })
        }
    }
}

/// `, song_id=` style lookahead for the given argument names
fn sibling_regex(siblings: &[&str]) -> Option<Regex> {
    if siblings.is_empty() {
        return None;
    }
    let names: Vec<String> = siblings.iter().map(|name| regex::escape(name)).collect();
    Regex::new(&format!(r"^\s*,\s*(?:{})\s*=", names.join("|"))).ok()
}

fn unquoted_free_text(src: &str, start: usize) -> FreeText {
    let end = src.rfind(')').filter(|&i| i >= start).unwrap_or(src.len());
    let raw = &src[start..end];
    let value = raw.trim();
    FreeText {
        value: value.to_string(),
        truncated: end == src.len(),
        span: start..end,
    }
}

/// Find `field=value` anywhere in `src`, skipping matches inside `exclude`
pub(crate) fn find_field(src: &str, field: &str, exclude: Option<&Range<usize>>) -> Option<Value> {
    let assignment = assignment_regex(field)?;
    let found = assignment
        .find_iter(src)
        .find(|m| exclude.map_or(true, |range| !range.contains(&m.start())))
        .map(|m| {
            let mut cursor = Cursor::at(src, m.end());
            parse_value(&mut cursor)
        });
    found
}

/// Apply the schema for `kind` on top of the generic parse.
///
/// Returns the names of arguments that fell back to a default.
pub(crate) fn apply(
    kind: ToolKind,
    src: &str,
    positional: Option<Value>,
    args: &mut Map<String, Value>,
) -> Vec<String> {
    let schema = ArgSchema::for_tool(kind);

    if let (Some(name), Some(value)) = (schema.positional, positional) {
        args.entry(name.to_string()).or_insert(value);
    }

    let mut free_span: Option<Range<usize>> = None;
    if let Some(field) = schema.free_text {
        let siblings: Vec<&str> = schema.fields.iter().copied().filter(|name| *name != field).collect();
        if let Some(text) = extract_free_text(src, field, &siblings) {
            if text.truncated {
                tracing::warn!(
                    "[Parser] {}: '{}' looks truncated, using {} chars to end of input",
                    kind.name(),
                    field,
                    text.value.len()
                );
            }
            args.insert(field.to_string(), Value::String(text.value));
            free_span = Some(text.span);
        }
    }

    for field in schema.fields {
        if args.contains_key(*field) {
            continue;
        }
        if let Some(value) = find_field(src, field, free_span.as_ref()) {
            tracing::debug!("[Parser] {}: recovered '{}' outside the argument list", kind.name(), field);
            args.insert(field.to_string(), value);
        }
    }

    let mut defaulted = Vec::new();
    for (field, default) in schema.defaults {
        if args.contains_key(*field) {
            continue;
        }
        tracing::warn!(
            "[Parser] {}: missing '{}', using default {:?}",
            kind.name(),
            field,
            default
        );
        args.insert(field.to_string(), default.to_value());
        defaulted.push(field.to_string());
    }

    defaulted
}
