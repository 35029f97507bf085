//! Tools the model can call
//!
//! - `tool` - the closed [`ToolCall`] set and its typed inputs
//! - `registry` - [`ToolRegistry`], dispatch by `match`
//! - `search` / `fetch` - web collaborators behind traits
//! - `vocabulary` - chunked model extraction with tokenizer fallback
//! - `save` - artifact persistence with vocabulary backfill

mod fetch;
mod html;
mod lyrics;
mod registry;
mod save;
mod search;
mod song_id;
mod tool;
mod vocabulary;

pub use fetch::{HttpPageFetcher, PageContent, PageFetcher};
pub use html::{extract_lyrics_from_html, is_primarily_spanish, ExtractedLyrics};
pub use lyrics::{clean_lyrics, decode_escapes, NO_LYRICS};
pub use registry::ToolRegistry;
pub use save::{save_results, vocabulary_from_values};
pub use search::{DisabledSearch, SearchResult, SerpApiSearch, WebSearch};
pub use song_id::{clean_song_id, generate_song_id, sanitize_song_id, slugify, song_id_from_request};
pub use tool::{
    ExtractVocabularyInput, FetchPageInput, GenerateIdInput, LyricsInput, SaveResultsInput,
    SearchInput, ToolCall, ToolKind, ToolOutput, DEFAULT_MAX_RESULTS,
};
pub use vocabulary::{
    chunk_text, dedup_vocabulary, fallback_vocabulary, parse_vocabulary_reply, VocabularyExtractor,
    VocabularyItem, FALLBACK_LIMIT, MAX_CHUNK_CHARS, MIN_TEXT_CHARS,
};
