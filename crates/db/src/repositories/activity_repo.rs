//! Repository for the append-only `activity_logs` table.
//!
//! Rows are only ever inserted; a database trigger rejects UPDATE and
//! DELETE.

use pagespace_core::ai_undo::store::LedgerScope;
use pagespace_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::activity::{ActivityLog, CreateActivityLog};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `activity_logs` SELECT queries.
const COLUMNS: &str = "\
    id, action_type, entity_type, entity_id, user_id, page_id, drive_id, \
    conversation_id, is_ai_action, before_state, after_state, changes, \
    description, undoes_activity_id, created_at";

/// Column list for INSERT (excludes auto-generated `id`, `created_at`).
const INSERT_COLUMNS: &str = "\
    action_type, entity_type, entity_id, user_id, page_id, drive_id, \
    conversation_id, is_ai_action, before_state, after_state, changes, \
    description, undoes_activity_id";

// ---------------------------------------------------------------------------
// ActivityRepo
// ---------------------------------------------------------------------------

/// Provides append and range queries over the activity ledger.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Append a ledger entry, returning the stored row.
    ///
    /// Accepts a pool or a transaction connection so an entry can commit
    /// together with the change it records.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        input: &CreateActivityLog,
    ) -> Result<ActivityLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO activity_logs ({INSERT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(&input.action_type)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(input.user_id)
            .bind(input.page_id)
            .bind(input.drive_id)
            .bind(input.conversation_id)
            .bind(input.is_ai_action)
            .bind(&input.before_state)
            .bind(&input.after_state)
            .bind(&input.changes)
            .bind(&input.description)
            .bind(input.undoes_activity_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActivityLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activity_logs WHERE id = $1");
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// AI entries in scope for an undo, newest first.
    ///
    /// Entries already reversed by an `undo` entry are excluded.
    pub async fn list_ai_in_scope(
        pool: &PgPool,
        scope: &LedgerScope,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs a
             WHERE a.is_ai_action
               AND a.created_at >= $1
               AND (a.page_id = $2 OR a.drive_id = $3)
               AND (a.conversation_id IS NULL OR a.conversation_id = $4)
               AND NOT EXISTS (
                   SELECT 1 FROM activity_logs u WHERE u.undoes_activity_id = a.id
               )
             ORDER BY a.created_at DESC, a.id DESC"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(scope.since)
            .bind(scope.page_id)
            .bind(scope.drive_id)
            .bind(scope.conversation_id)
            .fetch_all(pool)
            .await
    }

    /// The `undo` entry reversing `activity_id`, if any.
    pub async fn find_undo_of(
        pool: &PgPool,
        activity_id: DbId,
    ) -> Result<Option<ActivityLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM activity_logs WHERE undoes_activity_id = $1");
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(activity_id)
            .fetch_optional(pool)
            .await
    }

    /// Full history of one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: DbId,
    ) -> Result<Vec<ActivityLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM activity_logs
             WHERE entity_type = $1 AND entity_id = $2
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ActivityLog>(&query)
            .bind(entity_type)
            .bind(entity_id)
            .fetch_all(pool)
            .await
    }
}
