//! Tool dispatch
//!
//! The registry owns every collaborator a tool needs and executes a
//! [`ToolCall`] with a `match` over its variant. Every tool is awaited inline,
//! so no two tool calls of one run are ever in flight together.

use std::sync::Arc;

use super::fetch::PageFetcher;
use super::save::save_results;
use super::search::WebSearch;
use super::song_id::generate_song_id;
use super::tool::{ToolCall, ToolOutput};
use super::vocabulary::VocabularyExtractor;
use crate::core::{AgentError, AgentResult};
use crate::storage::ArtifactStore;

/// Collaborators behind the five tools
#[derive(Clone)]
pub struct ToolRegistry {
    search: Arc<dyn WebSearch>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: VocabularyExtractor,
    store: ArtifactStore,
}

impl ToolRegistry {
    pub fn new(
        search: Arc<dyn WebSearch>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: VocabularyExtractor,
        store: ArtifactStore,
    ) -> Self {
        Self {
            search,
            fetcher,
            extractor,
            store,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn extractor(&self) -> &VocabularyExtractor {
        &self.extractor
    }

    /// Execute one tool call
    pub async fn execute(&self, call: &ToolCall) -> AgentResult<ToolOutput> {
        tracing::info!("[ToolRegistry] Executing tool: {}", call.name());
        tracing::debug!("[ToolRegistry] Input: {:?}", call);

        let output = match call {
            ToolCall::Search(input) => {
                let results = self
                    .search
                    .search(&input.query, input.max_results)
                    .await
                    .map_err(|e| AgentError::tool_error(format!("search_web_serp failed: {:#}", e)))?;
                ToolOutput::Search(results)
            }
            ToolCall::FetchPage(input) => ToolOutput::Page(self.fetcher.fetch(&input.url).await),
            ToolCall::ExtractVocabulary(input) => {
                ToolOutput::Vocabulary(self.extractor.extract(&input.text).await)
            }
            ToolCall::GenerateId(input) => {
                ToolOutput::SongId(generate_song_id(&input.artist, &input.title))
            }
            ToolCall::SaveResults(input) => {
                let song_id = save_results(input, &self.store, &self.extractor).await?;
                ToolOutput::Saved { song_id }
            }
        };

        tracing::debug!("[ToolRegistry] Tool {} completed", call.name());
        Ok(output)
    }
}
