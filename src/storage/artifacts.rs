//! Lyrics and vocabulary artifacts on disk
//!
//! `{lyrics_dir}/{song_id}.txt` holds plain text and
//! `{vocabulary_dir}/{song_id}.json` a pretty-printed array of items.
//! Writes overwrite; the two files are not written atomically together.

use glob::glob;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{AgentError, AgentResult};
use crate::tools::VocabularyItem;

/// Default directory for lyrics files
pub const LYRICS_DIR: &str = "outputs/lyrics";
/// Default directory for vocabulary files
pub const VOCABULARY_DIR: &str = "outputs/vocabulary";

/// A saved song, as read back from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongArtifact {
    pub song_id: String,
    pub lyrics: String,
    pub vocabulary: Vec<VocabularyItem>,
}

/// File layout for song artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    lyrics_dir: PathBuf,
    vocabulary_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(lyrics_dir: impl Into<PathBuf>, vocabulary_dir: impl Into<PathBuf>) -> Self {
        Self {
            lyrics_dir: lyrics_dir.into(),
            vocabulary_dir: vocabulary_dir.into(),
        }
    }

    pub fn lyrics_dir(&self) -> &Path {
        &self.lyrics_dir
    }

    pub fn vocabulary_dir(&self) -> &Path {
        &self.vocabulary_dir
    }

    pub fn lyrics_path(&self, song_id: &str) -> PathBuf {
        self.lyrics_dir.join(format!("{}.txt", song_id))
    }

    pub fn vocabulary_path(&self, song_id: &str) -> PathBuf {
        self.vocabulary_dir.join(format!("{}.json", song_id))
    }

    /// Create both output directories if needed
    pub fn ensure_dirs(&self) -> AgentResult<()> {
        fs::create_dir_all(&self.lyrics_dir)?;
        fs::create_dir_all(&self.vocabulary_dir)?;
        Ok(())
    }

    /// Whether both artifacts exist for `song_id`
    pub fn exists(&self, song_id: &str) -> bool {
        self.lyrics_path(song_id).is_file() && self.vocabulary_path(song_id).is_file()
    }

    pub fn write_lyrics(&self, song_id: &str, lyrics: &str) -> AgentResult<PathBuf> {
        fs::create_dir_all(&self.lyrics_dir)?;
        let path = self.lyrics_path(song_id);
        fs::write(&path, lyrics)?;
        tracing::info!("[Storage] Saved lyrics to {}", path.display());
        Ok(path)
    }

    pub fn write_vocabulary(&self, song_id: &str, items: &[VocabularyItem]) -> AgentResult<PathBuf> {
        fs::create_dir_all(&self.vocabulary_dir)?;
        let path = self.vocabulary_path(song_id);
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&path, json)?;
        tracing::info!("[Storage] Saved {} vocabulary items to {}", items.len(), path.display());
        Ok(path)
    }

    pub fn load_lyrics(&self, song_id: &str) -> AgentResult<String> {
        let path = self.lyrics_path(song_id);
        if !path.is_file() {
            return Err(AgentError::ArtifactNotFound(format!("Lyrics not found: {}", song_id)));
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn load_vocabulary(&self, song_id: &str) -> AgentResult<Vec<VocabularyItem>> {
        let path = self.vocabulary_path(song_id);
        if !path.is_file() {
            return Err(AgentError::ArtifactNotFound(format!(
                "Vocabulary not found: {}",
                song_id
            )));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read both artifacts for `song_id`
    pub fn load(&self, song_id: &str) -> AgentResult<SongArtifact> {
        Ok(SongArtifact {
            song_id: song_id.to_string(),
            lyrics: self.load_lyrics(song_id)?,
            vocabulary: self.load_vocabulary(song_id)?,
        })
    }

    /// Stem of the most recently modified lyrics file
    pub fn latest_song_id(&self) -> AgentResult<Option<String>> {
        let dir = self.lyrics_dir.to_string_lossy();
        let pattern = format!("{}/*.txt", glob::Pattern::escape(&dir));

        let latest = glob(&pattern)
            .map_err(|e| AgentError::other(format!("Invalid lyrics pattern: {}", e)))?
            .filter_map(|entry| entry.ok())
            .filter_map(|path| {
                let mtime = path.metadata().ok()?.modified().ok()?;
                Some((path, mtime))
            })
            .max_by_key(|(_, mtime)| *mtime)
            .and_then(|(path, _)| path.file_stem().map(|s| s.to_string_lossy().into_owned()));

        Ok(latest)
    }
}

impl Default for ArtifactStore {
    fn default() -> Self {
        Self::new(LYRICS_DIR, VOCABULARY_DIR)
    }
}
