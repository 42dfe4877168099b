use std::time::Instant;

use tracing::info;

use crate::models::analysis::AnalysisOutcome;
use crate::orchestrator::engine::Orchestrator;
use crate::orchestrator::error::SearchError;

/// The system boundary: validates a caller's request and runs it through the orchestrator.
pub struct SearchService {
    orchestrator: Orchestrator,
    default_top_k: usize,
    max_top_k: usize,
}

impl SearchService {
    pub fn new(orchestrator: Orchestrator, default_top_k: usize, max_top_k: usize) -> Self {
        Self {
            orchestrator,
            default_top_k,
            max_top_k,
        }
    }

    pub async fn search_candidates(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<AnalysisOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".to_string()));
        }

        let top_k = top_k.unwrap_or(self.default_top_k);
        if top_k == 0 || top_k > self.max_top_k {
            return Err(SearchError::InvalidRequest(format!(
                "num_results must be between 1 and {}, got {top_k}",
                self.max_top_k
            )));
        }

        info!("Search run started: top_k={top_k}, query_chars={}", query.chars().count());
        let started = Instant::now();

        let outcome = self.orchestrator.run(query, top_k).await?;

        info!(
            "Search run finished in {}ms: turns={}, candidates={}, input_tokens={}, output_tokens={}",
            started.elapsed().as_millis(),
            outcome.turns,
            outcome.result.candidates.len(),
            outcome.usage.input_tokens,
            outcome.usage.output_tokens
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::models::analysis::TokenUsage;
    use crate::orchestrator::conversation::Conversation;
    use crate::orchestrator::engine::{OrchestratorLimits, ReasoningService, ReplyEnvelope, ServiceReply};
    use crate::orchestrator::error::ReasoningFailure;
    use crate::tools::ToolRegistry;

    /// Always answers with an empty shortlist.
    struct NobodyReasoner;

    #[async_trait]
    impl ReasoningService for NobodyReasoner {
        async fn respond(&self, _conversation: &Conversation) -> Result<ServiceReply, ReasoningFailure> {
            Ok(ServiceReply {
                envelope: ReplyEnvelope::FinalAnswer {
                    text: r#"{"summary": "No candidates found.", "candidates": []}"#.to_string(),
                },
                usage: TokenUsage::default(),
            })
        }
    }

    fn service() -> SearchService {
        let orchestrator = Orchestrator::new(
            Arc::new(NobodyReasoner),
            ToolRegistry::new(),
            OrchestratorLimits::default(),
        );
        SearchService::new(orchestrator, 7, 15)
    }

    #[tokio::test]
    async fn test_blank_query_is_invalid() {
        let err = service().search_candidates("   ", None).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[tokio::test]
    async fn test_top_k_bounds() {
        let svc = service();
        assert_eq!(
            svc.search_candidates("rust", Some(0)).await.unwrap_err().kind(),
            "invalid_request"
        );
        assert_eq!(
            svc.search_candidates("rust", Some(16)).await.unwrap_err().kind(),
            "invalid_request"
        );
        assert!(svc.search_candidates("rust", Some(15)).await.is_ok());
    }

    #[tokio::test]
    async fn test_default_top_k_used() {
        let outcome = service().search_candidates("rust", None).await.unwrap();
        assert!(outcome.result.candidates.is_empty());
        assert_eq!(outcome.turns, 1);
    }
}
