use std::sync::Arc;

use crate::config::Config;
use crate::index::admin::IndexAdmin;
use crate::orchestrator::SearchService;
use crate::routes::rate_limit::SearchRateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub index_admin: Arc<IndexAdmin>,
    pub search_limiter: Arc<SearchRateLimiter>,
    pub config: Arc<Config>,
}
