use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::resume::ingest::ResumeIngestor;
use crate::resume::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Profile persistence, shared with the ingestor. Swappable for tests.
    pub profiles: Arc<dyn ProfileStore>,
    pub ingestor: ResumeIngestor,
}
