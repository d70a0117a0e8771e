//! Application state

use engine::{PgNotifier, PgStore, ProgressionEngine, SystemClock};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub engine: ProgressionEngine,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let clock = Arc::new(SystemClock);
        let engine = ProgressionEngine::new(
            Arc::new(PgStore::new(pool.clone())),
            Arc::new(PgNotifier::new(pool.clone(), clock.clone())),
            clock,
        );
        Self { pool, engine }
    }
}
