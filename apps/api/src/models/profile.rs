use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum characters of resume text handed to the reasoning service per snippet.
pub const SNIPPET_TEXT_LIMIT: usize = 1500;
const TRUNCATION_MARKER: &str = "...\n(Full resume text truncated for brevity)";

/// Descriptive fields carried alongside a profile's raw text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub name: String,
    pub job_title: String,
    pub level: String,
    pub industry: String,
    pub skills: Vec<String>,
}

/// A candidate profile as held by the vector index.
///
/// Created at index-build time and read-only afterwards. `embedding` always has
/// the index's fixed dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub text: String,
    pub metadata: ProfileMetadata,
    pub embedding: Vec<f32>,
}

/// A ranked profile as returned to the reasoning service in a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnippet {
    pub profile_id: String,
    pub name: String,
    pub job_title: String,
    pub level: String,
    pub industry: String,
    pub skills: Vec<String>,
    pub score: f32,
    pub text: String,
}

impl ProfileSnippet {
    pub fn from_profile(profile: &CandidateProfile, score: f32) -> Self {
        Self {
            profile_id: profile.id.clone(),
            name: profile.metadata.name.clone(),
            job_title: profile.metadata.job_title.clone(),
            level: profile.metadata.level.clone(),
            industry: profile.metadata.industry.clone(),
            skills: profile.metadata.skills.clone(),
            score,
            text: truncate_text(&profile.text, SNIPPET_TEXT_LIMIT),
        }
    }
}

/// Truncates on a char boundary and appends the truncation marker when cut.
fn truncate_text(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Profile columns of the `candidate_profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub job_title: String,
    pub level: String,
    pub industry: String,
    pub skills: Vec<String>,
    pub raw_text: String,
    pub embedding: Vec<f32>,
}

impl From<ProfileRow> for CandidateProfile {
    fn from(row: ProfileRow) -> Self {
        CandidateProfile {
            id: row.id,
            text: row.raw_text,
            metadata: ProfileMetadata {
                name: row.name,
                job_title: row.job_title,
                level: row.level,
                industry: row.industry,
                skills: row.skills,
            },
            embedding: row.embedding,
        }
    }
}
