//! Retrieval Tool — text query → embedding → nearest profiles, ranked.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::embedding::{normalize_input, Embedder, EmbeddingError};
use crate::index::{IndexError, VectorIndex};
use crate::models::profile::ProfileSnippet;
use crate::tools::{
    ArgumentKind, ArgumentSchema, CapabilitySchema, ToolContext, ToolError, ToolHandler,
    ToolOutput,
};

pub const SEARCH_TOOL_NAME: &str = "search_resume_database";

const SEARCH_TOOL_DESCRIPTION: &str = "\
    Searches the proprietary resume database for candidate profiles semantically similar \
    to a natural-language description of the role. Use this tool whenever you need candidate \
    resumes to answer a hiring query. Returns the most relevant profiles first, each with \
    profile_id, name, job title, level, industry, skills, similarity score and resume text.";

const NO_MATCHES_MESSAGE: &str = "\
    No candidate profiles matched this search: the resume database returned zero results. \
    Report that no candidates were found by answering with an empty candidates list.";

const RENDER_FAILED_MESSAGE: &str = "\
    The search ran but its results could not be rendered, so none are shown. \
    Do not cite any profile from this search.";

/// Profiles returned by one search, most relevant first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub profiles: Vec<ProfileSnippet>,
}

impl RetrievalResult {
    /// Renders the result as tool-result text for the reasoning service.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        if self.profiles.is_empty() {
            return Ok(NO_MATCHES_MESSAGE.to_string());
        }
        serde_json::to_string_pretty(self)
    }
}

/// Profiles that could not be shown to the reasoning service are not evidence.
fn tool_output(rendered: Result<String, serde_json::Error>, evidence_ids: Vec<String>) -> ToolOutput {
    match rendered {
        Ok(content) => ToolOutput {
            content,
            evidence_ids,
        },
        Err(e) => {
            warn!("Could not render {} search results: {e}", evidence_ids.len());
            ToolOutput {
                content: RENDER_FAILED_MESSAGE.to_string(),
                evidence_ids: Vec::new(),
            }
        }
    }
}

pub struct RetrievalTool {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    embedding_timeout: Duration,
    index_timeout: Duration,
    capability: CapabilitySchema,
}

impl RetrievalTool {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        embedding_timeout: Duration,
        index_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            embedding_timeout,
            index_timeout,
            capability: CapabilitySchema {
                name: SEARCH_TOOL_NAME.to_string(),
                description: SEARCH_TOOL_DESCRIPTION.to_string(),
                argument_schema: ArgumentSchema::new().required(
                    "query",
                    ArgumentKind::String,
                    "Description of the ideal candidate: role, seniority, skills, industry.",
                ),
            },
        }
    }

    /// Embeds `query_text` and returns the `top_k` nearest profiles.
    ///
    /// Embedding failures are not retried. An empty index yields an empty result.
    pub async fn search(&self, query_text: &str, top_k: usize) -> Result<RetrievalResult, ToolError> {
        let text = normalize_input(query_text);

        let embedding = tokio::time::timeout(self.embedding_timeout, self.embedder.embed(&text))
            .await
            .map_err(|_| EmbeddingError::Timeout(self.embedding_timeout.as_secs()))??;

        let nearest = tokio::time::timeout(self.index_timeout, self.index.query_nearest(&embedding, top_k))
            .await
            .map_err(|_| IndexError::Timeout(self.index_timeout.as_secs()))??;

        let profiles: Vec<ProfileSnippet> = nearest
            .iter()
            .take(top_k)
            .map(|hit| ProfileSnippet::from_profile(&hit.profile, hit.score))
            .collect();

        info!(
            "Retrieval returned {} profiles (top_k={top_k}) for query {:?}",
            profiles.len(),
            query_text.chars().take(60).collect::<String>()
        );

        Ok(RetrievalResult { profiles })
    }
}

#[async_trait]
impl ToolHandler for RetrievalTool {
    fn capability(&self) -> &CapabilitySchema {
        &self.capability
    }

    async fn invoke(&self, arguments: &Value, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let result = self.search(query, ctx.top_k).await?;

        let evidence_ids = result.profiles.iter().map(|p| p.profile_id.clone()).collect();
        Ok(tool_output(result.render(), evidence_ids))
    }
}
