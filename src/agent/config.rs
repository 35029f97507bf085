//! Agent configuration
//!
//! ```ignore
//! let config = AgentConfig::from_env()?
//!     .with_max_turns(10)
//!     .with_lyrics_dir("/tmp/lyrics");
//! ```

use std::env;
use std::path::PathBuf;

use crate::core::{AgentError, AgentResult};
use crate::llm::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::storage::{ArtifactStore, LYRICS_DIR, VOCABULARY_DIR};

pub const DEFAULT_MAX_TURNS: usize = 15;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Settings for one agent and the service around it
#[derive(Clone)]
pub struct AgentConfig {
    /// Chat model identifier
    pub model_name: String,

    /// Chat completions API key
    pub api_key: String,

    /// Chat completions API base URL
    pub api_base: String,

    /// SerpApi key; search fails at call time when absent
    pub search_api_key: Option<String>,

    pub lyrics_dir: PathBuf,
    pub vocabulary_dir: PathBuf,

    /// Turn budget per request
    pub max_turns: usize,

    /// Sampling temperature for agent turns
    pub temperature: f32,

    /// Optional per-minute budgets for the provider's rate limiter
    pub requests_per_minute: Option<u32>,
    pub tokens_per_minute: Option<u32>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> AgentResult<Option<T>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AgentError::InvalidConfig(format!("{} is not a valid number: {}", name, raw))),
        _ => Ok(None),
    }
}

impl AgentConfig {
    /// Configuration with defaults and an explicit API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            search_api_key: None,
            lyrics_dir: PathBuf::from(LYRICS_DIR),
            vocabulary_dir: PathBuf::from(VOCABULARY_DIR),
            max_turns: DEFAULT_MAX_TURNS,
            temperature: DEFAULT_TEMPERATURE,
            requests_per_minute: None,
            tokens_per_minute: None,
        }
    }

    /// Read configuration from environment variables
    ///
    /// - `OPENAI_API_KEY` (required)
    /// - `MODEL_NAME`, `OPENAI_BASE_URL`, `SERPAPI_API_KEY`
    /// - `LYRICS_DIR`, `VOCAB_DIR`, `MAX_TURNS`
    /// - `RATE_LIMIT_RPM`, `RATE_LIMIT_TPM`
    pub fn from_env() -> AgentResult<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::InvalidConfig("OPENAI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = env::var("MODEL_NAME") {
            config.model_name = model;
        }
        if let Ok(base) = env::var("OPENAI_BASE_URL") {
            config.api_base = base;
        }
        config.search_api_key = env::var("SERPAPI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        if let Ok(dir) = env::var("LYRICS_DIR") {
            config.lyrics_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("VOCAB_DIR") {
            config.vocabulary_dir = PathBuf::from(dir);
        }
        if let Some(turns) = env_parse("MAX_TURNS")? {
            config.max_turns = turns;
        }
        config.requests_per_minute = env_parse("RATE_LIMIT_RPM")?;
        config.tokens_per_minute = env_parse("RATE_LIMIT_TPM")?;

        config.validate()?;
        tracing::info!(
            "[Config] model={} max_turns={} lyrics_dir={} vocabulary_dir={}",
            config.model_name,
            config.max_turns,
            config.lyrics_dir.display(),
            config.vocabulary_dir.display()
        );
        Ok(config)
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.max_turns == 0 {
            return Err(AgentError::InvalidConfig("max_turns must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    pub fn with_lyrics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lyrics_dir = dir.into();
        self
    }

    pub fn with_vocabulary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.vocabulary_dir = dir.into();
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_minute: u32, tokens_per_minute: u32) -> Self {
        self.requests_per_minute = Some(requests_per_minute);
        self.tokens_per_minute = Some(tokens_per_minute);
        self
    }

    /// Artifact store rooted at the configured directories
    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.lyrics_dir, &self.vocabulary_dir)
    }
}

// Keys never end up in logs.
impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model_name", &self.model_name)
            .field("api_base", &self.api_base)
            .field("search_configured", &self.search_api_key.is_some())
            .field("lyrics_dir", &self.lyrics_dir)
            .field("vocabulary_dir", &self.vocabulary_dir)
            .field("max_turns", &self.max_turns)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::new("sk-test");
        assert_eq!(config.model_name, "gpt-4o");
        assert_eq!(config.max_turns, 15);
        assert_eq!(config.lyrics_dir, PathBuf::from("outputs/lyrics"));
        assert_eq!(config.vocabulary_dir, PathBuf::from("outputs/vocabulary"));
        assert!(config.requests_per_minute.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = AgentConfig::new("k")
            .with_model("gpt-4o-mini")
            .with_max_turns(3)
            .with_rate_limit(60, 90_000)
            .with_lyrics_dir("/tmp/l");
        assert_eq!(config.model_name, "gpt-4o-mini");
        assert_eq!(config.max_turns, 3);
        assert_eq!(config.tokens_per_minute, Some(90_000));
        assert_eq!(config.artifact_store().lyrics_path("x"), PathBuf::from("/tmp/l/x.txt"));
    }

    #[test]
    fn test_zero_turns_rejected() {
        let err = AgentConfig::new("k").with_max_turns(0).validate().unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfig(_)));
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", AgentConfig::new("sk-secret").with_search_api_key("serp-secret"));
        assert!(!rendered.contains("secret"));
    }
}
