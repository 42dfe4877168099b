mod config;
mod db;
mod embedding;
mod errors;
mod index;
mod llm_client;
mod models;
mod orchestrator;
mod routes;
mod state;
mod tools;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::{CachedEmbedder, Embedder, OpenAiEmbedder};
use crate::index::admin::IndexAdmin;
use crate::index::store::{ProfileStore, ResumeArchive};
use crate::index::{InMemoryVectorIndex, VectorIndex};
use crate::llm_client::LlmClient;
use crate::orchestrator::{Orchestrator, SearchService};
use crate::routes::build_router;
use crate::routes::rate_limit::SearchRateLimiter;
use crate::state::AppState;
use crate::tools::retrieval::RetrievalTool;
use crate::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("lark_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lark API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    let store = ProfileStore::new(db);
    store.ensure_schema().await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let archive = ResumeArchive::new(s3, config.s3_bucket.clone());
    info!("S3 client initialized");

    // Initialize embedding client behind the Redis cache
    let openai = OpenAiEmbedder::new(
        config.openai_api_key.clone(),
        config.embedding_model.clone(),
        Duration::from_secs(config.embedding_timeout_secs),
    )?;
    info!("Embedding client initialized (model: {})", openai.model());
    let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        openai,
        redis,
        config.embedding_model.clone(),
        config.embedding_cache_ttl_secs,
    ));

    // Rebuild the vector index from persisted profiles
    let index = Arc::new(InMemoryVectorIndex::new());
    let index_admin = Arc::new(IndexAdmin::new(
        index.clone(),
        embedder.clone(),
        store,
        archive,
    ));
    index_admin.rebuild_from_store().await?;

    if let Some(count) = config.seed_mock_resumes {
        if index.stats().await.profiles == 0 {
            let report = index_admin.seed(count).await?;
            info!(
                "Startup seeding indexed {} of {} mock resumes",
                report.indexed, report.requested
            );
        }
    }

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Register tools and build the orchestrator
    let registry = ToolRegistry::new().register(Arc::new(RetrievalTool::new(
        embedder,
        index,
        Duration::from_secs(config.embedding_timeout_secs),
        Duration::from_secs(config.index_timeout_secs),
    )));
    let limits = config.limits();
    info!(
        "Orchestrator limits: turns={}, schema_repairs={}, tool_corrections={}, transport_retries={}",
        limits.max_turns,
        limits.max_schema_repairs,
        limits.max_tool_corrections,
        limits.max_transport_retries
    );
    let orchestrator = Orchestrator::new(Arc::new(llm), registry, limits);
    let search = Arc::new(SearchService::new(
        orchestrator,
        config.default_top_k,
        config.max_top_k,
    ));

    let search_quota = NonZeroU32::new(config.search_rate_limit_per_minute)
        .context("SEARCH_RATE_LIMIT_PER_MINUTE must be at least 1")?;
    info!("Search rate limit: {search_quota} requests per minute per key");

    // Build app state
    let state = AppState {
        search,
        index_admin,
        search_limiter: Arc::new(SearchRateLimiter::per_minute(search_quota)),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the UI host is fixed
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "lark-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
