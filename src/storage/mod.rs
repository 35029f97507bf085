//! Artifact persistence

mod artifacts;

pub use artifacts::{ArtifactStore, SongArtifact, LYRICS_DIR, VOCABULARY_DIR};
