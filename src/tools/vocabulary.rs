//! Vocabulary extraction
//!
//! Long text is split into chunks, each chunk is sent to the model in JSON
//! mode, and the items are merged with case-insensitive de-duplication. When
//! every model call fails, a tokenizer-based fallback list is returned so the
//! tool never errors past its boundary.

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::llm::{ChatRequest, LlmProvider};

pub const MIN_TEXT_CHARS: usize = 10;
pub const MAX_CHUNK_CHARS: usize = 500;
pub const FALLBACK_LIMIT: usize = 30;
pub const EXTRACTION_TEMPERATURE: f32 = 0.3;

pub const FALLBACK_NOTE: &str = "Automatically extracted";
pub const PLACEHOLDER_WORD: &str = "No vocabulary found";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One word or phrase with its translation and grammar notes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    #[serde(alias = "word")]
    pub spanish: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pronunciation: String,
    #[serde(default, alias = "translation", deserialize_with = "null_as_default")]
    pub english: String,
    #[serde(
        rename = "type",
        alias = "part_of_speech",
        default,
        deserialize_with = "null_as_default"
    )]
    pub word_type: String,
    #[serde(default)]
    pub conjugation_group: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_irregular: bool,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

impl VocabularyItem {
    /// Parse a loosely shaped item; `None` unless `spanish` is present and non-empty
    pub fn from_value(value: &Value) -> Option<Self> {
        let mut item: VocabularyItem = serde_json::from_value(value.clone()).ok()?;
        item.spanish = item.spanish.trim().to_string();
        if item.spanish.is_empty() {
            return None;
        }
        Some(item)
    }

    /// Low-confidence entry produced by tokenization
    pub fn fallback(word: impl Into<String>) -> Self {
        Self {
            spanish: word.into(),
            word_type: "unknown".to_string(),
            notes: FALLBACK_NOTE.to_string(),
            ..Default::default()
        }
    }

    /// Written when no vocabulary could be produced at all
    pub fn placeholder() -> Self {
        Self {
            spanish: PLACEHOLDER_WORD.to_string(),
            english: PLACEHOLDER_WORD.to_string(),
            word_type: "unknown".to_string(),
            notes: "Vocabulary extraction failed".to_string(),
            ..Default::default()
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.spanish.eq_ignore_ascii_case(PLACEHOLDER_WORD)
    }
}

/// Keep the first item for each case-insensitive `spanish` key
pub fn dedup_vocabulary(items: Vec<VocabularyItem>) -> Vec<VocabularyItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.spanish.trim().to_lowercase()))
        .collect()
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Cuts at the last sentence end (`.`, `!`, `?`, newline) inside the window,
/// else the last clause break (`,`, `;`, `:`), else the last whitespace, else
/// exactly at the limit. Only whitespace at the cut points is dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let Some((window_end, _)) = rest.char_indices().nth(max_chars) else {
            let last = rest.trim_end();
            if !last.is_empty() {
                chunks.push(last.to_string());
            }
            break;
        };

        let window = &rest[..window_end];
        let cut = last_break(window, |c| matches!(c, '.' | '!' | '?' | '\n'))
            .or_else(|| last_break(window, |c| matches!(c, ',' | ';' | ':')))
            .or_else(|| last_break(window, char::is_whitespace))
            .unwrap_or(window_end);

        let chunk = rest[..cut].trim_end();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    chunks
}

/// Byte offset just past the last char in `window` matching `is_break`
fn last_break(window: &str, is_break: impl Fn(char) -> bool) -> Option<usize> {
    window
        .char_indices()
        .rev()
        .find(|(_, c)| is_break(*c))
        .map(|(idx, c)| idx + c.len_utf8())
}

const SPANISH_CHARS: &str = "áéíóúñü";
const COMMON_WORDS: [&str; 13] = [
    "el", "la", "los", "las", "un", "una", "y", "o", "de", "en", "con", "por", "para",
];

/// Tokenizer fallback: unique lowercase words that look Spanish
pub fn fallback_vocabulary(text: &str) -> Vec<VocabularyItem> {
    tracing::info!("[Vocabulary] Generating fallback vocabulary");
    let Ok(word_re) = Regex::new(r"\b\w+\b") else {
        return Vec::new();
    };
    let lower = text.to_lowercase();
    let mut seen = HashSet::new();

    let items: Vec<VocabularyItem> = word_re
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|word| {
            word.chars().any(|c| SPANISH_CHARS.contains(c)) || COMMON_WORDS.contains(word)
        })
        .filter(|word| word.chars().count() > 2)
        .filter(|word| seen.insert(word.to_string()))
        .take(FALLBACK_LIMIT)
        .map(VocabularyItem::fallback)
        .collect();

    tracing::info!("[Vocabulary] Fallback vocabulary has {} items", items.len());
    items
}

/// Accepts `{"vocabulary": [...]}`, a bare array, or `- "word" - "gloss" - type` lines
pub fn parse_vocabulary_reply(reply: &str) -> Option<Vec<Value>> {
    let trimmed = reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(mut map)) => match map.remove("vocabulary") {
            Some(Value::Array(items)) => return Some(items),
            _ => return None,
        },
        Ok(Value::Array(items)) => return Some(items),
        _ => {}
    }

    let list_re = Regex::new(
        r#"(?m)^\s*[-•*]\s*["']?([^"'\n]+?)["']?\s*[-–—]\s*["']?([^"'\n]+?)["']?\s*[-–—]\s*([^\n]+?)\s*$"#,
    )
    .ok()?;
    let items: Vec<Value> = list_re
        .captures_iter(trimmed)
        .map(|caps| {
            serde_json::json!({
                "spanish": caps[1].trim(),
                "english": caps[2].trim(),
                "type": caps[3].trim(),
                "notes": FALLBACK_NOTE,
            })
        })
        .collect();

    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn extraction_prompt(chunk: &str) -> String {
    format!(
        "Extract the Spanish vocabulary a learner needs from the text below.\n\
         For every word or phrase give: the Spanish form, a pronunciation guide, \
         the English meaning, the part of speech, the verb conjugation group and \
         whether the verb is irregular, the noun gender, and a short note on how \
         it is used in this text.\n\n\
         Respond with a JSON object of the form:\n\
         {{\"vocabulary\": [{{\"spanish\": \"\", \"pronunciation\": \"\", \"english\": \"\", \
         \"type\": \"\", \"conjugation_group\": null, \"is_irregular\": false, \
         \"gender\": null, \"notes\": \"\"}}]}}\n\n\
         Text:\n{}",
        chunk
    )
}

/// Model-backed vocabulary extraction
#[derive(Clone)]
pub struct VocabularyExtractor {
    llm: Arc<dyn LlmProvider>,
    max_chunk_chars: usize,
    temperature: f32,
}

impl VocabularyExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_chunk_chars: MAX_CHUNK_CHARS,
            temperature: EXTRACTION_TEMPERATURE,
        }
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Extract vocabulary from `text`. Text shorter than the minimum yields
    /// nothing; if every chunk request fails the fallback list is returned.
    pub async fn extract(&self, text: &str) -> Vec<VocabularyItem> {
        let length = text.trim().chars().count();
        if length < MIN_TEXT_CHARS {
            tracing::warn!(
                "[Vocabulary] Text is too short ({} chars), returning empty vocabulary",
                length
            );
            return Vec::new();
        }

        let chunks = chunk_text(text, self.max_chunk_chars);
        tracing::info!(
            "[Vocabulary] Extracting from {} chars in {} chunk(s)",
            length,
            chunks.len()
        );

        let mut items = Vec::new();
        let mut failures = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            match self.extract_chunk(chunk).await {
                Ok(batch) => {
                    tracing::debug!("[Vocabulary] Chunk {} produced {} items", index + 1, batch.len());
                    items.extend(batch);
                }
                Err(e) => {
                    tracing::warn!("[Vocabulary] Chunk {} failed: {:#}", index + 1, e);
                    failures += 1;
                }
            }
        }

        if failures == chunks.len() {
            tracing::warn!("[Vocabulary] All extraction requests failed, using fallback");
            return fallback_vocabulary(text);
        }

        let unique = dedup_vocabulary(items);
        tracing::info!("[Vocabulary] Extracted {} unique items", unique.len());
        unique
    }

    /// Extraction for the save step: never empty when the text has any
    /// Spanish-looking words.
    pub async fn backfill(&self, text: &str) -> Vec<VocabularyItem> {
        let items = self.extract(text).await;
        if items.is_empty() {
            fallback_vocabulary(text)
        } else {
            items
        }
    }

    async fn extract_chunk(&self, chunk: &str) -> anyhow::Result<Vec<VocabularyItem>> {
        let request = ChatRequest::prompt(extraction_prompt(chunk))
            .with_temperature(self.temperature)
            .with_json_mode();
        let reply = self.llm.chat(request).await?;
        let values = parse_vocabulary_reply(&reply)
            .context("Vocabulary reply was neither JSON nor a word list")?;

        let mut items = Vec::with_capacity(values.len());
        for value in values {
            match VocabularyItem::from_value(&value) {
                Some(item) => items.push(item),
                None => tracing::warn!("[Vocabulary] Dropping malformed item: {}", value),
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use proptest::prelude::*;
    use serde_json::json;

    const LYRICS: &str = "Sí, sabes que ya llevo un rato mirándote.\nTengo que bailar contigo hoy.";

    fn extractor(llm: ScriptedLlm) -> (Arc<ScriptedLlm>, VocabularyExtractor) {
        let llm = Arc::new(llm);
        (llm.clone(), VocabularyExtractor::new(llm))
    }

    #[test]
    fn test_item_from_value() {
        let item = VocabularyItem::from_value(&json!({
            "word": " bailar ", "translation": "to dance", "part_of_speech": "verb",
            "notes": null, "is_irregular": null
        }))
        .unwrap();
        assert_eq!(item.spanish, "bailar");
        assert_eq!(item.english, "to dance");
        assert_eq!(item.word_type, "verb");
        assert_eq!(item.notes, "");
        assert!(!item.is_irregular);

        assert!(VocabularyItem::from_value(&json!({"english": "x"})).is_none());
        assert!(VocabularyItem::from_value(&json!({"spanish": "  "})).is_none());
        assert!(VocabularyItem::from_value(&json!("hola")).is_none());
    }

    #[test]
    fn test_item_serializes_all_fields() {
        let value = serde_json::to_value(VocabularyItem::fallback("corazón")).unwrap();
        assert_eq!(
            value,
            json!({
                "spanish": "corazón", "pronunciation": "", "english": "", "type": "unknown",
                "conjugation_group": null, "is_irregular": false, "gender": null,
                "notes": FALLBACK_NOTE
            })
        );
    }

    #[test]
    fn test_dedup_keeps_first_seen() {
        let items = vec![
            VocabularyItem { english: "first".into(), ..VocabularyItem::fallback("Amor") },
            VocabularyItem::fallback("vida"),
            VocabularyItem { english: "second".into(), ..VocabularyItem::fallback("amor") },
        ];
        let unique = dedup_vocabulary(items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].english, "first");
        assert_eq!(unique[1].spanish, "vida");
    }

    #[test]
    fn test_chunk_prefers_sentence_then_clause() {
        let text = "Uno dos. Tres cuatro, cinco seis";
        assert_eq!(chunk_text(text, 12), vec!["Uno dos.", "Tres cuatro,", "cinco seis"]);
        assert_eq!(chunk_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(chunk_text("corto", 500), vec!["corto"]);
        assert!(chunk_text("   ", 10).is_empty());
    }

    #[test]
    fn test_fallback_vocabulary() {
        let items = fallback_vocabulary("El corazón de la canción, el corazón y la canción para mí");
        let words: Vec<&str> = items.iter().map(|i| i.spanish.as_str()).collect();
        assert_eq!(words, vec!["corazón", "canción", "para"]);
        assert!(items.iter().all(|i| i.word_type == "unknown" && i.notes == FALLBACK_NOTE));

        let many: String = (0..50).map(|i| format!("niño{} ", i)).collect();
        assert_eq!(fallback_vocabulary(&many).len(), FALLBACK_LIMIT);
    }

    #[test]
    fn test_parse_reply_forms() {
        let object = parse_vocabulary_reply(r#"{"vocabulary": [{"spanish": "sí"}]}"#).unwrap();
        assert_eq!(object.len(), 1);
        let fenced = parse_vocabulary_reply("```json\n[{\"spanish\": \"sí\"}]\n```").unwrap();
        assert_eq!(fenced.len(), 1);
        let list = parse_vocabulary_reply(
            "Here you go:\n- \"sí\" - \"yes\" - adverb\n- \"sabes\" - \"you know\" - verb",
        )
        .unwrap();
        assert_eq!(list[1]["spanish"], "sabes");
        assert_eq!(list[1]["english"], "you know");
        assert_eq!(list[1]["type"], "verb");
        assert!(parse_vocabulary_reply("no idea").is_none());
        assert!(parse_vocabulary_reply(r#"{"words": []}"#).is_none());
    }

    #[tokio::test]
    async fn test_short_text_is_empty_not_error() {
        let (llm, extractor) = extractor(ScriptedLlm::new());
        assert!(extractor.extract("hola").await.is_empty());
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_extract_merges_chunks() {
        let (llm, extractor) = extractor(
            ScriptedLlm::new()
                .with_extraction_reply(r#"{"vocabulary": [{"spanish": "sabes", "english": "you know"}, {"english": "no key"}]}"#)
                .with_extraction_reply(r#"{"vocabulary": [{"spanish": "Sabes"}, {"spanish": "bailar"}]}"#),
        );
        let extractor = extractor.with_max_chunk_chars(45);
        let items = extractor.extract(LYRICS).await;
        let words: Vec<&str> = items.iter().map(|i| i.spanish.as_str()).collect();
        assert_eq!(words, vec!["sabes", "bailar"]);

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.json_mode));
        assert_eq!(requests[0].temperature, Some(EXTRACTION_TEMPERATURE));
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_chunks() {
        let (_, extractor) = extractor(
            ScriptedLlm::new()
                .with_extraction_error("rate limited")
                .with_extraction_reply(r#"[{"spanish": "bailar"}]"#),
        );
        let items = extractor.with_max_chunk_chars(45).extract(LYRICS).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].spanish, "bailar");
    }

    #[tokio::test]
    async fn test_total_failure_uses_fallback() {
        let (_, extractor) = extractor(ScriptedLlm::new().with_extraction_error("down"));
        let items = extractor.extract(LYRICS).await;
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.notes == FALLBACK_NOTE));
        assert!(items.iter().any(|i| i.spanish == "mirándote"));
    }

    #[tokio::test]
    async fn test_backfill_falls_back_on_empty_reply() {
        let (_, extractor) = extractor(ScriptedLlm::new().with_extraction_reply(r#"{"vocabulary": []}"#));
        let items = extractor.backfill(LYRICS).await;
        assert!(items.iter().any(|i| i.spanish == "mirándote"));
    }

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #[test]
        fn prop_chunks_bounded_and_lossless(
            text in "[a-zA-Záéñ .,;:!?\n]{0,1500}",
            max in 1usize..600,
        ) {
            let chunks = chunk_text(&text, max);
            for chunk in &chunks {
                prop_assert!(chunk.chars().count() <= max);
                prop_assert!(!chunk.is_empty());
            }
            prop_assert_eq!(strip_ws(&chunks.concat()), strip_ws(&text));
        }
    }
}
