use std::sync::Arc;

use pagespace_core::ai_undo::UndoEngine;
use pagespace_db::restorers::default_registry;
use pagespace_db::stores::{PgActivityLedger, PgMessageStore, PgPageDirectory};
use pagespace_db::DbPool;
use pagespace_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
    /// AI undo engine wired to Postgres.
    pub engine: Arc<UndoEngine>,
    /// Bus for workspace events published after mutations.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    pub fn new(pool: DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let engine = Arc::new(build_undo_engine(&pool, &config));
        Self {
            pool,
            config: Arc::new(config),
            engine,
            event_bus,
        }
    }
}

/// Wire the undo engine to the Postgres collaborators and built-in restorers.
pub fn build_undo_engine(pool: &DbPool, config: &ServerConfig) -> UndoEngine {
    UndoEngine::new(
        Arc::new(PgMessageStore::new(pool.clone())),
        Arc::new(PgActivityLedger::new(pool.clone())),
        Arc::new(PgPageDirectory::new(pool.clone())),
        default_registry(pool),
        config.undo,
    )
}
