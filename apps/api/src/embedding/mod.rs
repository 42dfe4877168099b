//! Embedding client — converts text into fixed-length vectors via the OpenAI embeddings API.
//!
//! Callers depend on the `Embedder` trait; `OpenAiEmbedder` is the HTTP backend and
//! `CachedEmbedder` decorates any embedder with a Redis cache.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod cache;

pub use cache::CachedEmbedder;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("embedding service returned no vectors")]
    EmptyResponse,

    #[error("embedding service timed out after {0}s")]
    Timeout(u64),
}

impl EmbeddingError {
    pub fn is_timeout(&self) -> bool {
        match self {
            EmbeddingError::Timeout(_) => true,
            EmbeddingError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Converts text to an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// HTTP embedder backed by the OpenAI embeddings endpoint. Not retried: failures
/// propagate to the caller.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: String, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = normalize_input(text);
        let request = EmbeddingRequest {
            model: &self.model,
            input: [input.as_str()],
        };

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(EmbeddingError::EmptyResponse)?;

        debug!("Embedded {} chars into {} dims", text.len(), embedding.len());
        Ok(embedding)
    }
}

/// Newlines degrade embedding quality; they are flattened to spaces.
pub fn normalize_input(text: &str) -> String {
    text.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_input_flattens_newlines() {
        assert_eq!(normalize_input("Senior\nBackend\nEngineer"), "Senior Backend Engineer");
    }

    #[test]
    fn test_embedding_response_parses_first_vector() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.1,0.2,0.3]}],"model":"text-embedding-3-small","usage":{"prompt_tokens":3,"total_tokens":3}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_embedding_request_serializes_single_input() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: ["hello"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"], serde_json::json!(["hello"]));
        assert_eq!(json["model"], "text-embedding-3-small");
    }

    #[test]
    fn test_timeout_error_is_classified() {
        assert!(EmbeddingError::Timeout(5).is_timeout());
        assert!(!EmbeddingError::EmptyResponse.is_timeout());
    }
}
