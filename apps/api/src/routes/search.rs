use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::analysis::AnalysisResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub num_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: &'static str,
    pub analysis_data: AnalysisResult,
}

/// POST /v1/search_candidates
/// Runs one search and returns the ranked analysis. No partial result on failure.
pub async fn handle_search_candidates(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let outcome = state
        .search
        .search_candidates(&req.query, req.num_results)
        .await?;

    Ok(Json(SearchResponse {
        status: "success",
        analysis_data: outcome.result,
    }))
}
