mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod models;
mod resume;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{LlmClient, RetryPolicy};
use crate::resume::fields::LlmFieldParser;
use crate::resume::ingest::ResumeIngestor;
use crate::resume::store::{PgProfileStore, ProfileStore};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Job Board API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize completion client
    let llm = LlmClient::new(
        config.parser_api_url.clone(),
        config.parser_api_key.clone(),
        config.parser_timeout,
        RetryPolicy {
            max_attempts: config.parser_max_attempts,
            ..RetryPolicy::default()
        },
    )?;
    info!(
        "LLM client initialized (endpoint: {}, timeout: {:?}, attempts: {})",
        llm.endpoint(),
        config.parser_timeout,
        config.parser_max_attempts
    );

    // Resume ingestion pipeline
    let profiles: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(db.clone()));
    let ingestor = ResumeIngestor::new(
        Arc::new(LlmFieldParser::new(llm)),
        profiles.clone(),
        config.upload_dir.clone(),
    );
    info!("Resume uploads stored under {}", config.upload_dir.display());

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        profiles,
        ingestor,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
