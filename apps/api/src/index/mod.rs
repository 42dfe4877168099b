//! Vector index over candidate profiles.
//!
//! `InMemoryVectorIndex` keeps an immutable snapshot behind an `Arc`. Searches clone the
//! `Arc` and score outside any lock, so concurrent queries never wait on each other.
//! Inserts and clears build a new snapshot and swap it in while holding the write lock,
//! which keeps writers mutually exclusive.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::profile::CandidateProfile;

pub mod admin;
pub mod seed;
pub mod store;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("profile id '{0}' is already indexed")]
    DuplicateId(String),

    #[error("profile '{0}' has an empty embedding")]
    EmptyEmbedding(String),

    #[error("vector index timed out after {0}s")]
    Timeout(u64),
}

/// A profile paired with its similarity to the query vector.
#[derive(Debug, Clone)]
pub struct ScoredProfile {
    pub profile: Arc<CandidateProfile>,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub profiles: usize,
    pub dimension: Option<usize>,
}

/// Nearest-neighbor lookup over candidate profiles.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns at most `k` profiles ranked by similarity, most similar first.
    /// Ties keep insertion order.
    async fn query_nearest(&self, vector: &[f32], k: usize)
        -> Result<Vec<ScoredProfile>, IndexError>;

    async fn stats(&self) -> IndexStats;
}

#[derive(Debug, Default)]
struct IndexSnapshot {
    dimension: Option<usize>,
    profiles: Vec<Arc<CandidateProfile>>,
}

#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from profiles in insertion order.
    pub async fn from_profiles(profiles: Vec<CandidateProfile>) -> Result<Self, IndexError> {
        let index = Self::new();
        index.insert_batch(profiles).await?;
        Ok(index)
    }

    /// Appends profiles. The whole batch is rejected if any profile is invalid.
    pub async fn insert_batch(&self, profiles: Vec<CandidateProfile>) -> Result<usize, IndexError> {
        let mut guard = self.snapshot.write().await;
        let dimension = validate_batch(&guard, &profiles)?;

        let inserted = profiles.len();
        let mut next = guard.profiles.clone();
        next.extend(profiles.into_iter().map(Arc::new));
        *guard = Arc::new(IndexSnapshot {
            dimension,
            profiles: next,
        });

        Ok(inserted)
    }

    /// Runs the `insert_batch` checks against the current contents without inserting.
    pub async fn check_batch(&self, profiles: &[CandidateProfile]) -> Result<(), IndexError> {
        validate_batch(&*self.current().await, profiles).map(|_| ())
    }

    pub async fn clear(&self) {
        *self.snapshot.write().await = Arc::new(IndexSnapshot::default());
    }

    async fn current(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().await.clone()
    }
}

/// Returns the index dimension after appending `profiles` to `snapshot`.
fn validate_batch(
    snapshot: &IndexSnapshot,
    profiles: &[CandidateProfile],
) -> Result<Option<usize>, IndexError> {
    let mut dimension = snapshot.dimension;
    let mut seen: HashSet<&str> = snapshot.profiles.iter().map(|p| p.id.as_str()).collect();

    for profile in profiles {
        if profile.embedding.is_empty() {
            return Err(IndexError::EmptyEmbedding(profile.id.clone()));
        }
        match dimension {
            Some(expected) if expected != profile.embedding.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: profile.embedding.len(),
                });
            }
            Some(_) => {}
            None => dimension = Some(profile.embedding.len()),
        }
        if !seen.insert(profile.id.as_str()) {
            return Err(IndexError::DuplicateId(profile.id.clone()));
        }
    }

    Ok(dimension)
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredProfile>, IndexError> {
        let snapshot = self.current().await;

        let Some(dimension) = snapshot.dimension else {
            return Ok(Vec::new());
        };
        if dimension != vector.len() {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<ScoredProfile> = snapshot
            .profiles
            .iter()
            .map(|profile| ScoredProfile {
                profile: Arc::clone(profile),
                score: cosine_similarity(vector, &profile.embedding),
            })
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        Ok(scored)
    }

    async fn stats(&self) -> IndexStats {
        let snapshot = self.current().await;
        IndexStats {
            profiles: snapshot.profiles.len(),
            dimension: snapshot.dimension,
        }
    }
}

/// Cosine similarity in [-1, 1]. Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::ProfileMetadata;

    fn profile(id: &str, embedding: Vec<f32>) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            text: format!("resume {id}"),
            metadata: ProfileMetadata::default(),
            embedding,
        }
    }

    /// Unit vector whose cosine with [1, 0] is exactly `similarity`.
    fn at_similarity(similarity: f32) -> Vec<f32> {
        vec![similarity, (1.0 - similarity * similarity).sqrt()]
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_and_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_ranks_by_similarity_descending() {
        let index = InMemoryVectorIndex::from_profiles(vec![
            profile("low", at_similarity(0.40)),
            profile("high", at_similarity(0.91)),
            profile("mid", at_similarity(0.85)),
        ])
        .await
        .unwrap();

        let results = index.query_nearest(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.profile.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
        assert!((results[0].score - 0.91).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let index = InMemoryVectorIndex::from_profiles(vec![
            profile("first", vec![0.6, 0.8]),
            profile("second", vec![0.6, 0.8]),
            profile("third", vec![0.6, 0.8]),
        ])
        .await
        .unwrap();

        let results = index.query_nearest(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.profile.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_index_returns_no_results() {
        let index = InMemoryVectorIndex::new();
        let results = index.query_nearest(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(index.stats().await.profiles, 0);
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let index = InMemoryVectorIndex::from_profiles(vec![profile("only", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(index.query_nearest(&[1.0, 0.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_is_an_error() {
        let index = InMemoryVectorIndex::from_profiles(vec![profile("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        let err = index.query_nearest(&[1.0, 0.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_insert_rejects_mixed_dimensions_atomically() {
        let index = InMemoryVectorIndex::new();
        let err = index
            .insert_batch(vec![profile("a", vec![1.0, 0.0]), profile("b", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(index.stats().await.profiles, 0);
    }

    #[tokio::test]
    async fn test_check_batch_leaves_index_untouched() {
        let index = InMemoryVectorIndex::from_profiles(vec![profile("a", vec![1.0, 0.0])])
            .await
            .unwrap();

        let err = index
            .check_batch(&[profile("b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(index.check_batch(&[profile("b", vec![0.0, 1.0])]).await.is_ok());
        assert_eq!(index.stats().await.profiles, 1);
    }

    #[tokio::test]
    async fn test_nan_scores_do_not_disturb_ranking() {
        let index = InMemoryVectorIndex::from_profiles(vec![
            profile("nan", vec![f32::NAN, 0.0]),
            profile("low", at_similarity(0.2)),
            profile("high", at_similarity(0.9)),
        ])
        .await
        .unwrap();

        let hits = index.query_nearest(&[1.0, 0.0], 3).await.unwrap();
        let finite: Vec<&str> = hits
            .iter()
            .filter(|h| !h.score.is_nan())
            .map(|h| h.profile.id.as_str())
            .collect();
        assert_eq!(finite, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids() {
        let index = InMemoryVectorIndex::from_profiles(vec![profile("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        let err = index
            .insert_batch(vec![profile("a", vec![0.0, 1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId(id) if id == "a"));
    }

    #[tokio::test]
    async fn test_clear_resets_dimension() {
        let index = InMemoryVectorIndex::from_profiles(vec![profile("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        index.clear().await;
        assert_eq!(
            index.stats().await,
            IndexStats {
                profiles: 0,
                dimension: None
            }
        );
        index
            .insert_batch(vec![profile("b", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(index.stats().await.dimension, Some(3));
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_snapshot() {
        let index = Arc::new(
            InMemoryVectorIndex::from_profiles(vec![
                profile("a", vec![1.0, 0.0]),
                profile("b", vec![0.0, 1.0]),
            ])
            .await
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                tokio::spawn(async move { index.query_nearest(&[1.0, 0.0], 1).await })
            })
            .collect();

        for handle in handles {
            let results = handle.await.unwrap().unwrap();
            assert_eq!(results[0].profile.id, "a");
        }
    }
}
