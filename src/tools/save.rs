//! The `save_results` tool

use serde_json::Value;

use super::lyrics::{decode_escapes, NO_LYRICS};
use super::song_id::sanitize_song_id;
use super::tool::SaveResultsInput;
use super::vocabulary::{dedup_vocabulary, VocabularyExtractor, VocabularyItem};
use crate::core::AgentResult;
use crate::storage::ArtifactStore;

/// Typed items from the model's vocabulary argument; malformed ones are dropped
pub fn vocabulary_from_values(values: &[Value]) -> Vec<VocabularyItem> {
    let items = values
        .iter()
        .filter_map(|value| {
            let item = VocabularyItem::from_value(value);
            if item.is_none() {
                tracing::warn!("[SaveResults] Dropping malformed vocabulary item: {}", value);
            }
            item
        })
        .collect();
    dedup_vocabulary(items)
}

fn lyrics_text(input: &SaveResultsInput) -> String {
    let decoded = decode_escapes(input.lyrics.text());
    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        tracing::warn!("[SaveResults] No lyrics supplied, writing placeholder");
        NO_LYRICS.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Write both artifacts and return the song id they were written under.
///
/// Empty or placeholder vocabulary is backfilled from the lyrics before
/// writing. The lyrics file is written first.
pub async fn save_results(
    input: &SaveResultsInput,
    store: &ArtifactStore,
    extractor: &VocabularyExtractor,
) -> AgentResult<String> {
    let song_id = sanitize_song_id(&input.song_id);
    let lyrics = lyrics_text(input);

    let mut vocabulary = vocabulary_from_values(&input.vocabulary);
    let needs_backfill = vocabulary.is_empty() || vocabulary.iter().all(VocabularyItem::is_placeholder);
    if needs_backfill && lyrics != NO_LYRICS {
        tracing::info!("[SaveResults] Vocabulary missing, extracting from {} chars of lyrics", lyrics.len());
        vocabulary = extractor.backfill(&lyrics).await;
    }
    if vocabulary.is_empty() {
        tracing::warn!("[SaveResults] No vocabulary for {}, writing placeholder", song_id);
        vocabulary.push(VocabularyItem::placeholder());
    }

    store.write_lyrics(&song_id, &lyrics)?;
    store.write_vocabulary(&song_id, &vocabulary)?;

    tracing::info!(
        "[SaveResults] Saved {} ({} vocabulary items)",
        song_id,
        vocabulary.len()
    );
    Ok(song_id)
}
