use std::fmt;

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::index::IndexError;
use crate::llm_client::LlmError;
use crate::orchestrator::conversation::ConversationError;
use crate::tools::ToolError;

/// Why the reasoning service could not produce an accepted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasoningFailure {
    Transport(String),
    Timeout(u64),
    MalformedEnvelope(String),
    TurnLimitExceeded { turns: u32 },
}

impl ReasoningFailure {
    pub fn code(&self) -> &'static str {
        match self {
            ReasoningFailure::Transport(_) => "transport_error",
            ReasoningFailure::Timeout(_) => "timeout",
            ReasoningFailure::MalformedEnvelope(_) => "malformed_envelope",
            ReasoningFailure::TurnLimitExceeded { .. } => "turn_limit_exceeded",
        }
    }
}

impl fmt::Display for ReasoningFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.code())?;
        match self {
            ReasoningFailure::Transport(msg) | ReasoningFailure::MalformedEnvelope(msg) => {
                write!(f, "{msg}")
            }
            ReasoningFailure::Timeout(secs) => write!(f, "no reply within {secs}s"),
            ReasoningFailure::TurnLimitExceeded { turns } => {
                write!(f, "no final answer after {turns} turns")
            }
        }
    }
}

impl From<LlmError> for ReasoningFailure {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(secs) => ReasoningFailure::Timeout(secs),
            LlmError::Parse(_) | LlmError::EmptyContent | LlmError::MalformedEnvelope(_) => {
                ReasoningFailure::MalformedEnvelope(e.to_string())
            }
            LlmError::Http(_) | LlmError::Api { .. } | LlmError::RateLimited { .. } => {
                ReasoningFailure::Transport(e.to_string())
            }
        }
    }
}

/// Terminal failure of a search run. No partial result accompanies any of these.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("reasoning service error: {reason}")]
    ReasoningService { reason: ReasoningFailure },

    #[error("schema validation error: {0}")]
    SchemaValidation(String),

    #[error("tool contract violation ({tool}): {message}")]
    ToolContractViolation { tool: String, message: String },

    #[error("embedding service error: {0}")]
    EmbeddingService(EmbeddingError),

    #[error("vector index error: {0}")]
    Index(IndexError),

    #[error("conversation invariant violated: {0}")]
    Conversation(#[from] ConversationError),
}

impl SearchError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidRequest(_) => "invalid_request",
            SearchError::ReasoningService {
                reason: ReasoningFailure::Timeout(_),
            } => "reasoning_timeout_error",
            SearchError::ReasoningService { .. } => "reasoning_service_error",
            SearchError::SchemaValidation(_) => "schema_validation_error",
            SearchError::ToolContractViolation { .. } => "tool_contract_violation",
            SearchError::EmbeddingService(e) if e.is_timeout() => "embedding_timeout_error",
            SearchError::EmbeddingService(_) => "embedding_service_error",
            SearchError::Index(IndexError::Timeout(_)) => "index_timeout_error",
            SearchError::Index(_) => "index_error",
            SearchError::Conversation(_) => "internal_error",
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind().ends_with("_timeout_error")
    }
}

impl From<ToolError> for SearchError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Embedding(inner) => SearchError::EmbeddingService(inner),
            ToolError::Index(inner) => SearchError::Index(inner),
        }
    }
}
