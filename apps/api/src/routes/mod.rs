pub mod auth;
pub mod health;
pub mod index;
pub mod rate_limit;
pub mod search;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Everything under /v1 requires a bearer key; search is also rate limited per key.
    let api = Router::new()
        .route(
            "/v1/search_candidates",
            post(search::handle_search_candidates).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::limit_search,
            )),
        )
        .route("/v1/index/stats", get(index::handle_index_stats))
        .route("/v1/index/seed", post(index::handle_seed_index))
        .route("/v1/index", delete(index::handle_clear_index))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .merge(api)
        .with_state(state)
}
