//! Handlers for AI undo preview and execute.
//!
//! Both endpoints resolve the checkpoint and require edit access to the
//! checkpoint's page. Execute validates its body before touching storage,
//! maps the engine's outcome onto the status code, and always returns the
//! full result in the body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pagespace_core::ai_undo::{UndoCheckpoint, UndoMode, UndoOutcome};
use pagespace_core::error::CoreError;
use pagespace_core::types::DbId;
use pagespace_db::repositories::DriveRepo;
use pagespace_events::WorkspaceEvent;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for an execute.
#[derive(Debug, Deserialize)]
pub struct ExecuteUndoRequest {
    /// `messages_only` or `messages_and_changes`.
    pub mode: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the checkpoint and check the caller may edit its page.
async fn authorize(
    state: &AppState,
    auth: &AuthUser,
    message_id: DbId,
) -> AppResult<UndoCheckpoint> {
    let checkpoint = state.engine.resolve_checkpoint(message_id).await?;

    let allowed = DriveRepo::can_user_edit_page(&state.pool, auth.user_id, checkpoint.page_id)
        .await
        .map_err(|e| CoreError::store("check page edit access", e))?;
    if !allowed {
        tracing::warn!(
            user_id = auth.user_id,
            message_id,
            page_id = checkpoint.page_id,
            "AI undo denied: no edit access"
        );
        return Err(AppError::NoEditAccess);
    }

    Ok(checkpoint)
}

fn parse_mode(body: &ExecuteUndoRequest) -> AppResult<UndoMode> {
    let raw = body.mode.as_deref().ok_or(AppError::MissingMode)?;
    raw.parse::<UndoMode>()
        .map_err(|_| AppError::UnknownMode(raw.to_string()))
}

fn status_for(outcome: UndoOutcome) -> StatusCode {
    match outcome {
        UndoOutcome::Success => StatusCode::OK,
        UndoOutcome::PartialSuccess => StatusCode::MULTI_STATUS,
        UndoOutcome::Failure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /ai/undo/{message_id}
///
/// Report what an execute at this checkpoint would touch. Mutates nothing.
pub async fn preview_undo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let checkpoint = authorize(&state, &auth, message_id).await?;
    let preview = state.engine.preview_checkpoint(&checkpoint).await?;
    Ok(Json(DataResponse { data: preview }))
}

/// POST /ai/undo/{message_id}
///
/// 200 on full success, 207 when some reversals failed, 500 when nothing
/// could be undone. The body is `{data: UndoResult}` in all three cases.
pub async fn execute_undo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<DbId>,
    body: Result<Json<ExecuteUndoRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(body) = body.map_err(|rejection| AppError::MalformedBody(rejection.body_text()))?;
    let mode = parse_mode(&body)?;
    let checkpoint = authorize(&state, &auth, message_id).await?;

    let result = state
        .engine
        .execute_checkpoint(&checkpoint, mode, Some(auth.user_id))
        .await?;

    let outcome = result.outcome();
    if outcome != UndoOutcome::Failure {
        state.event_bus.publish(WorkspaceEvent::ai_undo_executed(
            &checkpoint,
            mode,
            &result,
            auth.user_id,
        ));
    }

    Ok((status_for(outcome), Json(DataResponse { data: result })))
}
