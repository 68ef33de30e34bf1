//! Chat message model and DTOs.

use pagespace_core::ai_undo::store::MessageRecord;
use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Allowed values for `chat_messages.role`.
pub mod roles {
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
    pub const SYSTEM: &str = "system";
    pub const TOOL: &str = "tool";
}

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub conversation_id: DbId,
    pub page_id: DbId,
    pub user_id: Option<DbId>,
    pub role: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub edited_at: Option<Timestamp>,
    pub deactivated_at: Option<Timestamp>,
    pub tool_calls: Option<serde_json::Value>,
    pub tool_results: Option<serde_json::Value>,
}

/// DTO for appending a message to a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateChatMessage {
    pub conversation_id: DbId,
    pub page_id: DbId,
    pub user_id: Option<DbId>,
    pub role: String,
    pub content: String,
    /// Defaults to `now()` when omitted.
    pub created_at: Option<Timestamp>,
}

impl From<ChatMessage> for MessageRecord {
    fn from(row: ChatMessage) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            page_id: row.page_id,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}
