//! Health handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    /// Entity types the undo engine can reverse.
    pub undoable_entity_types: Vec<String>,
}

/// GET /health
///
/// 503 when the database is down, since no undo can run without it.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = match pagespace_db::health_check(&state.pool).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check: database unreachable");
            false
        }
    };

    let undoable_entity_types = state
        .engine
        .restorers()
        .entity_types()
        .into_iter()
        .map(str::to_owned)
        .collect();

    let (code, status, database) = if database_up {
        (StatusCode::OK, "ok", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
            undoable_entity_types,
        }),
    )
}
