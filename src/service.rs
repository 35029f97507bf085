//! Request handling around the agent
//!
//! Runs the agent for one request, repairs a missing or unusable song id,
//! recovers the artifacts from cached lyrics when the model never saved
//! them, and reads the finished artifacts back.

use std::sync::Arc;

use crate::agent::{AgentConfig, SongVocabAgent};
use crate::core::{AgentError, AgentResult};
use crate::llm::{LlmProvider, OpenAiProvider, RateLimiter};
use crate::storage::{ArtifactStore, SongArtifact};
use crate::tools::{
    clean_lyrics, clean_song_id, song_id_from_request, DisabledSearch, HttpPageFetcher,
    PageFetcher, SerpApiSearch, ToolRegistry, VocabularyExtractor, WebSearch,
};

/// Ids that are really a label the model echoed back
const LABEL_WORDS: [&str; 2] = ["song", "for"];

pub struct SongVocabService {
    agent: SongVocabAgent,
    max_turns: usize,
}

impl SongVocabService {
    pub fn new(agent: SongVocabAgent, max_turns: usize) -> Self {
        Self { agent, max_turns }
    }

    /// Wire the OpenAI provider, search and fetcher from configuration
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        config.validate()?;

        let mut provider = OpenAiProvider::new(config.api_key.as_str())
            .with_model(config.model_name.as_str())
            .with_api_base(config.api_base.as_str());
        if let (Some(rpm), Some(tpm)) = (config.requests_per_minute, config.tokens_per_minute) {
            tracing::info!("[Service] Rate limit: {} requests, {} tokens per minute", rpm, tpm);
            provider = provider.with_rate_limiter(RateLimiter::per_minute(rpm, tpm));
        }
        let llm: Arc<dyn LlmProvider> = Arc::new(provider);

        let search: Arc<dyn WebSearch> = match &config.search_api_key {
            Some(key) => Arc::new(SerpApiSearch::new(key.as_str())),
            None => {
                tracing::warn!("[Service] SERPAPI_API_KEY not set, web search is disabled");
                Arc::new(DisabledSearch)
            }
        };
        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new());

        let store = config.artifact_store();
        store.ensure_dirs()?;

        let registry = ToolRegistry::new(search, fetcher, VocabularyExtractor::new(llm.clone()), store);
        let agent = SongVocabAgent::new(llm, registry).with_temperature(config.temperature);
        Ok(Self::new(agent, config.max_turns))
    }

    pub fn store(&self) -> &ArtifactStore {
        self.agent.tools().store()
    }

    /// Find lyrics and vocabulary for a free-text request
    pub async fn handle(&self, message_request: &str) -> AgentResult<SongArtifact> {
        let request = message_request.trim();
        if request.is_empty() {
            return Err(AgentError::InvalidRequest("message_request is empty".to_string()));
        }
        tracing::info!("[Service] Received request: {}", request);

        let response = self.agent.process_request(request, self.max_turns).await?;
        let song_id = resolve_request_song_id(&response.song_id, request)?;

        let store = self.store();
        if !store.exists(&song_id) {
            self.recover(&song_id, response.cached_lyrics.as_deref()).await?;
        }

        store.load(&song_id)
    }

    /// Write both artifacts from lyrics fetched during the run
    async fn recover(&self, song_id: &str, cached_lyrics: Option<&str>) -> AgentResult<()> {
        let Some(raw) = cached_lyrics.filter(|text| !text.trim().is_empty()) else {
            tracing::error!("[Service] Artifacts missing for {} and no cached lyrics", song_id);
            return Err(AgentError::ArtifactNotFound(format!(
                "Lyrics or vocabulary file not found for song_id: {}",
                song_id
            )));
        };

        tracing::warn!("[Service] Artifacts missing for {}, saving cached lyrics", song_id);
        let tools = self.agent.tools();
        let lyrics = clean_lyrics(raw);
        tools.store().write_lyrics(song_id, &lyrics)?;

        let vocabulary = tools.extractor().extract(&lyrics).await;
        tools.store().write_vocabulary(song_id, &vocabulary)?;
        Ok(())
    }
}

/// Clean the agent's song id, falling back to `<artist>-<title>` from the request
fn resolve_request_song_id(agent_song_id: &str, request: &str) -> AgentResult<String> {
    if let Some(id) = clean_song_id(agent_song_id) {
        if !LABEL_WORDS.contains(&id.to_lowercase().as_str()) {
            return Ok(id);
        }
    }

    tracing::warn!("[Service] Unusable song_id {:?}, deriving one from the request", agent_song_id);
    song_id_from_request(request).ok_or_else(|| {
        AgentError::InvalidRequest(format!(
            "Could not determine a valid song_id from response: {}",
            agent_song_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedLlm, StubFetcher, StubSearch};
    use tempfile::TempDir;

    const LYRICS: &str = "Sí, sabes que ya llevo un rato mirándote\nTengo que bailar contigo hoy";

    fn service(llm: ScriptedLlm, fetcher: StubFetcher) -> (SongVocabService, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("lyrics"), temp.path().join("vocabulary"));
        let llm: Arc<dyn LlmProvider> = Arc::new(llm);
        let registry = ToolRegistry::new(
            Arc::new(StubSearch::default()),
            Arc::new(fetcher),
            VocabularyExtractor::new(llm.clone()),
            store,
        );
        (SongVocabService::new(SongVocabAgent::new(llm, registry), 5), temp)
    }

    #[test]
    fn test_song_id_fallbacks() {
        assert_eq!(resolve_request_song_id("`luis-fonsi-despacito`", "x").unwrap(), "luis-fonsi-despacito");
        assert_eq!(
            resolve_request_song_id("song", "Find lyrics for Despacito by Luis Fonsi").unwrap(),
            "luis-fonsi-despacito"
        );
        let err = resolve_request_song_id("", "give me some lyrics").unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_handle_returns_saved_artifact() {
        let (service, _temp) = service(
            ScriptedLlm::new().with_agent_replies([
                format!(
                    r#"Tool: save_results(song_id="luis-fonsi-despacito", lyrics="{}", vocabulary=[{{"spanish": "bailar", "english": "to dance"}}])"#,
                    LYRICS
                ),
                "FINISHED song_id: luis-fonsi-despacito".to_string(),
            ]),
            StubFetcher::failing(),
        );

        let artifact = service.handle("Find lyrics for Despacito by Luis Fonsi").await.unwrap();
        assert_eq!(artifact.song_id, "luis-fonsi-despacito");
        assert_eq!(artifact.lyrics, LYRICS);
        assert_eq!(artifact.vocabulary[0].spanish, "bailar");
    }

    #[tokio::test]
    async fn test_handle_recovers_from_cached_lyrics() {
        let (service, _temp) = service(
            ScriptedLlm::new()
                .with_agent_replies([
                    r#"Tool: get_page_content(url="https://letras.example/despacito")"#,
                    "FINISHED song_id: luis-fonsi-despacito",
                ])
                .with_extraction_reply(r#"{"vocabulary": [{"spanish": "mirar", "english": "to look"}]}"#),
            StubFetcher::with_lyrics(LYRICS),
        );

        let artifact = service.handle("Find lyrics for Despacito by Luis Fonsi").await.unwrap();
        assert!(artifact.lyrics.contains("mirándote"));
        assert_eq!(artifact.vocabulary.len(), 1);
        assert_eq!(artifact.vocabulary[0].spanish, "mirar");
    }

    #[tokio::test]
    async fn test_handle_missing_artifacts_is_not_found() {
        let (service, _temp) = service(
            ScriptedLlm::new().with_agent_replies(["FINISHED song_id: nobody-nothing"]),
            StubFetcher::failing(),
        );

        let err = service.handle("nothing by nobody").await.unwrap_err();
        assert!(matches!(err, AgentError::ArtifactNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_handle_empty_request() {
        let (service, _temp) = service(ScriptedLlm::new(), StubFetcher::failing());
        let err = service.handle("   ").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_handle_exhausted_turns() {
        let (service, _temp) = service(
            ScriptedLlm::new().with_agent_replies(std::iter::repeat("hmm").take(5)),
            StubFetcher::failing(),
        );
        let err = service.handle("Despacito by Luis Fonsi").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxTurnsExceeded(5)));
        assert_eq!(err.status_code(), 500);
    }
}
