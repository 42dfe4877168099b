use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::index::admin::SeedReport;
use crate::index::IndexStats;
use crate::state::AppState;

const DEFAULT_SEED_COUNT: usize = 100;
const MAX_SEED_COUNT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct SeedRequest {
    pub count: Option<usize>,
}

/// GET /v1/index/stats
pub async fn handle_index_stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.index_admin.stats().await)
}

/// POST /v1/index/seed
/// Generates and indexes mock resumes. Body is optional: `{"count": n}`.
pub async fn handle_seed_index(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SeedReport>, AppError> {
    let count = seed_count(&body)?;
    Ok(Json(state.index_admin.seed(count).await?))
}

/// An empty body means the default count; anything else must be a valid request.
fn seed_count(body: &[u8]) -> Result<usize, AppError> {
    let count = if body.iter().all(u8::is_ascii_whitespace) {
        DEFAULT_SEED_COUNT
    } else {
        serde_json::from_slice::<SeedRequest>(body)
            .map_err(|e| AppError::Validation(format!("invalid seed request body: {e}")))?
            .count
            .unwrap_or(DEFAULT_SEED_COUNT)
    };

    if count == 0 || count > MAX_SEED_COUNT {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_SEED_COUNT}"
        )));
    }
    Ok(count)
}

/// DELETE /v1/index
pub async fn handle_clear_index(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let removed = state.index_admin.clear().await?;
    Ok(Json(json!({ "removed": removed })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_body_uses_default_count() {
        assert_eq!(seed_count(b"").unwrap(), DEFAULT_SEED_COUNT);
        assert_eq!(seed_count(b" \n").unwrap(), DEFAULT_SEED_COUNT);
        assert_eq!(seed_count(b"{}").unwrap(), DEFAULT_SEED_COUNT);
    }

    #[test]
    fn test_explicit_count_is_used() {
        assert_eq!(seed_count(br#"{"count": 25}"#).unwrap(), 25);
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let bodies: [&[u8]; 3] = [b"{\"count\": ", br#"{"count": "ten"}"#, br#"{"count": -5}"#];
        for body in bodies {
            let err = seed_count(body).unwrap_err();
            assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("invalid seed request body")));
        }
    }

    #[test]
    fn test_count_out_of_range_is_rejected() {
        assert!(matches!(seed_count(br#"{"count": 0}"#), Err(AppError::Validation(_))));
        assert!(matches!(seed_count(br#"{"count": 1001}"#), Err(AppError::Validation(_))));
    }
}
