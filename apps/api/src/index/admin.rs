//! Index lifecycle: rebuild at startup, seed with mock resumes, clear.
//!
//! These are the only writers of the in-memory index; the search path only reads.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::index::seed::generate_mock_resumes;
use crate::index::store::{ProfileStore, ResumeArchive};
use crate::index::{InMemoryVectorIndex, IndexStats, VectorIndex};
use crate::models::profile::CandidateProfile;

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub requested: usize,
    pub indexed: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct IndexAdmin {
    index: Arc<InMemoryVectorIndex>,
    embedder: Arc<dyn Embedder>,
    store: ProfileStore,
    archive: ResumeArchive,
}

impl IndexAdmin {
    pub fn new(
        index: Arc<InMemoryVectorIndex>,
        embedder: Arc<dyn Embedder>,
        store: ProfileStore,
        archive: ResumeArchive,
    ) -> Self {
        Self {
            index,
            embedder,
            store,
            archive,
        }
    }

    /// Replaces the in-memory index with the persisted profiles.
    pub async fn rebuild_from_store(&self) -> Result<usize> {
        let profiles = self.store.load_all().await?;
        self.index.clear().await;
        let count = self.index.insert_batch(profiles).await?;
        info!("Vector index rebuilt with {count} profiles");
        Ok(count)
    }

    /// Generates, embeds, persists, archives, and indexes `count` mock resumes.
    /// Resumes whose embedding fails are skipped with a warning.
    pub async fn seed(&self, count: usize) -> Result<SeedReport> {
        info!("Seeding index with {count} mock resumes...");
        let resumes = generate_mock_resumes(count, &mut rand::thread_rng());

        let mut embedded = Vec::with_capacity(resumes.len());
        let mut profiles = Vec::with_capacity(resumes.len());
        for resume in &resumes {
            let embedding = match self.embedder.embed(&resume.raw_text).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    warn!("Could not embed resume {}: {e}. Skipping.", resume.id);
                    continue;
                }
            };

            embedded.push(resume);
            profiles.push(CandidateProfile {
                id: resume.id.clone(),
                text: resume.raw_text.clone(),
                metadata: resume.metadata(),
                embedding,
            });
        }

        // Nothing is archived or persisted unless the index will take the batch.
        self.index.check_batch(&profiles).await?;

        let indexed = if profiles.is_empty() {
            0
        } else {
            for resume in embedded {
                self.archive.put(resume).await?;
            }
            self.store.insert_batch(&profiles).await?;
            self.index.insert_batch(profiles).await?
        };

        info!("Seeded {indexed}/{count} resumes into the vector index");
        Ok(SeedReport {
            requested: count,
            indexed,
            skipped: count - indexed,
        })
    }

    pub async fn clear(&self) -> Result<u64> {
        let removed = self.store.clear().await?;
        self.index.clear().await;
        info!("Cleared {removed} profiles from the index");
        Ok(removed)
    }

    pub async fn stats(&self) -> IndexStats {
        self.index.stats().await
    }
}
