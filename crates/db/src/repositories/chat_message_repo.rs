//! Repository for the `chat_messages` table.
//!
//! Messages are never hard-deleted: removal flips `is_active` and stamps
//! `deactivated_at`.

use pagespace_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::chat_message::{ChatMessage, CreateChatMessage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, conversation_id, page_id, user_id, role, content, is_active, \
    created_at, edited_at, deactivated_at, tool_calls, tool_results";

/// Provides lookups and the batch soft-delete for chat messages.
pub struct ChatMessageRepo;

impl ChatMessageRepo {
    /// Insert a message, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages (conversation_id, page_id, user_id, role, content, created_at)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(input.conversation_id)
            .bind(input.page_id)
            .bind(input.user_id)
            .bind(&input.role)
            .bind(&input.content)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Find a message by ID, active or not.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chat_messages WHERE id = $1");
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active messages in a conversation, oldest first.
    pub async fn list_active(
        pool: &PgPool,
        conversation_id: DbId,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages
             WHERE conversation_id = $1 AND is_active
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(conversation_id)
            .fetch_all(pool)
            .await
    }

    /// Count active messages in a conversation created at or after `since`.
    pub async fn count_active_since(
        pool: &PgPool,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM chat_messages
             WHERE conversation_id = $1 AND is_active AND created_at >= $2",
        )
        .bind(conversation_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Soft-delete every active message in a conversation created at or after
    /// `since`, in one statement. Returns the number of rows changed.
    pub async fn deactivate_since(
        pool: &PgPool,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_messages SET is_active = false, deactivated_at = NOW()
             WHERE conversation_id = $1 AND is_active AND created_at >= $2",
        )
        .bind(conversation_id)
        .bind(since)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
