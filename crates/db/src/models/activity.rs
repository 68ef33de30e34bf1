//! Activity ledger model and DTOs.

use pagespace_core::activity::ActivityKind;
use pagespace_core::ai_undo::store::{ActivityRecord, NewActivity};
use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the append-only `activity_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: DbId,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub user_id: Option<DbId>,
    pub page_id: Option<DbId>,
    pub drive_id: Option<DbId>,
    pub conversation_id: Option<DbId>,
    pub is_ai_action: bool,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub changes: Option<serde_json::Value>,
    pub description: Option<String>,
    pub undoes_activity_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl ActivityLog {
    pub fn kind(&self) -> ActivityKind {
        ActivityKind::from_undoes(self.undoes_activity_id)
    }
}

/// DTO for appending a ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivityLog {
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub user_id: Option<DbId>,
    pub page_id: Option<DbId>,
    pub drive_id: Option<DbId>,
    pub conversation_id: Option<DbId>,
    pub is_ai_action: bool,
    pub before_state: Option<serde_json::Value>,
    pub after_state: Option<serde_json::Value>,
    pub changes: Option<serde_json::Value>,
    pub description: Option<String>,
    pub undoes_activity_id: Option<DbId>,
}

impl From<ActivityLog> for ActivityRecord {
    fn from(row: ActivityLog) -> Self {
        Self {
            id: row.id,
            action_type: row.action_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            page_id: row.page_id,
            drive_id: row.drive_id,
            conversation_id: row.conversation_id,
            before_state: row.before_state,
            after_state: row.after_state,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

impl From<&NewActivity> for CreateActivityLog {
    fn from(entry: &NewActivity) -> Self {
        Self {
            action_type: entry.action_type.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            user_id: entry.user_id,
            page_id: entry.page_id,
            drive_id: entry.drive_id,
            conversation_id: entry.conversation_id,
            is_ai_action: entry.is_ai_action,
            before_state: entry.before_state.clone(),
            after_state: entry.after_state.clone(),
            changes: entry.changes.clone(),
            description: entry.description.clone(),
            undoes_activity_id: entry.undoes_activity_id,
        }
    }
}
