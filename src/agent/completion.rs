//! Completion marker handling

use regex::Regex;

use crate::core::{AgentError, AgentResult};
use crate::storage::ArtifactStore;
use crate::tools::clean_song_id;

/// Case-sensitive token the model sends when the task is done
pub const COMPLETION_MARKER: &str = "FINISHED";

pub fn is_completion(reply: &str) -> bool {
    reply.contains(COMPLETION_MARKER)
}

/// `song_id: x`, `song id = "x"`, `**Song ID:** x` and similar.
/// The label needs a `:` or `=` so prose like "the song id is" is skipped.
fn labeled_song_id(reply: &str) -> Option<String> {
    let re = Regex::new(r#"(?i)song[_\s]id["'`*]*\s*[:=]\s*["'`*]*([^"'`*}\s,.]+)"#).ok()?;
    let id = re
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| clean_song_id(m.as_str()));
    id
}

fn backtick_song_id(reply: &str) -> Option<String> {
    let re = Regex::new(r"`([^`]+)`").ok()?;
    let id = re
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_song_id(m.as_str()));
    id
}

/// Resolve the song id of a completed run: labeled field, then a backtick
/// token, then the newest lyrics file. Fails with `MissingSongId` otherwise.
pub fn resolve_song_id(reply: &str, store: &ArtifactStore) -> AgentResult<String> {
    if let Some(id) = labeled_song_id(reply) {
        return Ok(id);
    }
    if let Some(id) = backtick_song_id(reply) {
        return Ok(id);
    }

    match store.latest_song_id() {
        Ok(Some(id)) => {
            tracing::info!("[Agent] Found song_id from latest lyrics file: {}", id);
            return Ok(id);
        }
        Ok(None) => {}
        Err(e) => tracing::error!("[Agent] Error finding song_id from files: {}", e),
    }

    tracing::error!("[Agent] {} found but no song_id in response", COMPLETION_MARKER);
    Err(AgentError::MissingSongId)
}
