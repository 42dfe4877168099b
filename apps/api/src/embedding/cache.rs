use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Embedder, EmbeddingError};

/// Redis-backed cache in front of another embedder.
///
/// Cache failures never fail an embedding: they are logged and the inner
/// embedder is called directly.
pub struct CachedEmbedder<E> {
    inner: E,
    redis: redis::Client,
    model: String,
    ttl_secs: u64,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(inner: E, redis: redis::Client, model: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            inner,
            redis,
            model: model.into(),
            ttl_secs,
        }
    }

    async fn lookup(&self, key: &str) -> redis::RedisResult<Option<Vec<f32>>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached.and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    async fn store(&self, key: &str, embedding: &[f32]) -> redis::RedisResult<()> {
        let Ok(raw) = serde_json::to_string(embedding) else {
            return Ok(());
        };
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, raw, self.ttl_secs).await
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = cache_key(&self.model, text);

        match self.lookup(&key).await {
            Ok(Some(embedding)) => {
                debug!("Embedding cache hit for {key}");
                return Ok(embedding);
            }
            Ok(None) => {}
            Err(e) => warn!("Embedding cache lookup failed, bypassing cache: {e}"),
        }

        let embedding = self.inner.embed(text).await?;

        if let Err(e) = self.store(&key, &embedding).await {
            warn!("Embedding cache write failed: {e}");
        }

        Ok(embedding)
    }
}

/// Stable key per (model, text): a name-based UUID keeps keys short for long texts.
fn cache_key(model: &str, text: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, text.as_bytes());
    format!("embedding:{model}:{digest}")
}
