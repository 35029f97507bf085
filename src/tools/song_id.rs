//! Song identifiers
//!
//! A song id is the shared file stem of the lyrics and vocabulary artifacts,
//! so it must be safe as a file name.

use regex::Regex;

use crate::parser::UNKNOWN_SONG_ID;

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Lowercase ASCII words joined by single hyphens
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.to_lowercase().chars().map(fold_diacritic) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// `artist-title` slug used as the song id
pub fn generate_song_id(artist: &str, title: &str) -> String {
    let id = [slugify(artist), slugify(title)]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if id.is_empty() {
        UNKNOWN_SONG_ID.to_string()
    } else {
        id
    }
}

/// Strip markdown, labels and path characters from a model-written id.
/// Returns `None` when nothing usable is left.
pub fn clean_song_id(raw: &str) -> Option<String> {
    let mut id = raw.replace(['*', '`', '"', '\'', '/', '\\'], "");
    if let Ok(label) = Regex::new(r"(?i)^\s*song[\s_-]*id\s*[:=]?\s*") {
        id = label.replace(&id, "").into_owned();
    }
    let id = id
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '-' && c != '_')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    let id = id.trim_start_matches('.').to_string();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Like [`clean_song_id`] but never empty
pub fn sanitize_song_id(raw: &str) -> String {
    clean_song_id(raw).unwrap_or_else(|| {
        tracing::warn!("[SongId] Unusable song id {:?}, using {}", raw, UNKNOWN_SONG_ID);
        UNKNOWN_SONG_ID.to_string()
    })
}

/// Derive an id from a request such as `find lyrics for Despacito by Luis Fonsi`
pub fn song_id_from_request(request: &str) -> Option<String> {
    let lower = request.to_lowercase();
    let (title_part, artist_part) = lower.split_once(" by ")?;
    let title = match Regex::new(r"^.*?\b(?:for|of)\s+(?:the\s+song\s+)?") {
        Ok(prefix) => prefix.replace(title_part, "").into_owned(),
        Err(_) => title_part.to_string(),
    };
    let quotes: &[char] = &['"', '\'', '“', '”', '.', '?', '!'];
    let title = title.trim().trim_matches(quotes);
    let artist = artist_part.trim().trim_matches(quotes);
    if title.is_empty() || artist.is_empty() {
        return None;
    }
    Some(generate_song_id(artist, title))
}
