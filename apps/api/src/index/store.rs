use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use tracing::info;

use crate::index::seed::MockResume;
use crate::models::profile::{CandidateProfile, ProfileRow};

/// PostgreSQL persistence for indexed profiles. The in-memory index is rebuilt
/// from here at startup, in insertion order.
#[derive(Clone)]
pub struct ProfileStore {
    pool: PgPool,
}

impl ProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the profiles table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidate_profiles (
                seq        BIGSERIAL PRIMARY KEY,
                id         TEXT NOT NULL UNIQUE,
                name       TEXT NOT NULL,
                job_title  TEXT NOT NULL,
                level      TEXT NOT NULL,
                industry   TEXT NOT NULL,
                skills     TEXT[] NOT NULL DEFAULT '{}',
                raw_text   TEXT NOT NULL,
                embedding  REAL[] NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create candidate_profiles table")?;
        Ok(())
    }

    pub async fn load_all(&self) -> Result<Vec<CandidateProfile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, name, job_title, level, industry, skills, raw_text, embedding
            FROM candidate_profiles
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        info!("Loaded {} candidate profiles from PostgreSQL", rows.len());
        Ok(rows.into_iter().map(CandidateProfile::from).collect())
    }

    /// Inserts profiles in one transaction, preserving slice order in `seq`.
    pub async fn insert_batch(&self, profiles: &[CandidateProfile]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for profile in profiles {
            sqlx::query(
                r#"
                INSERT INTO candidate_profiles
                    (id, name, job_title, level, industry, skills, raw_text, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&profile.id)
            .bind(&profile.metadata.name)
            .bind(&profile.metadata.job_title)
            .bind(&profile.metadata.level)
            .bind(&profile.metadata.industry)
            .bind(&profile.metadata.skills)
            .bind(&profile.text)
            .bind(&profile.embedding)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM candidate_profiles")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Raw resume documents archived to S3 as `resumes/{id}.json`.
#[derive(Clone)]
pub struct ResumeArchive {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl ResumeArchive {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { s3, bucket }
    }

    pub async fn put(&self, resume: &MockResume) -> Result<String> {
        let key = archive_key(&resume.id);
        let body = serde_json::to_vec_pretty(resume)?;

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(Bytes::from(body)))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        Ok(key)
    }
}

fn archive_key(resume_id: &str) -> String {
    format!("resumes/{resume_id}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_key_layout() {
        assert_eq!(archive_key("abc-123"), "resumes/abc-123.json");
    }
}
