//! Postgres-backed collaborators for the undo engine.

use async_trait::async_trait;
use pagespace_core::ai_undo::store::{
    ActivityLedger, ActivityRecord, LedgerScope, MessageRecord, MessageStore, PageDirectory,
};
use pagespace_core::error::CoreError;
use pagespace_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::repositories::{ActivityRepo, ChatMessageRepo, PageRepo};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// [`MessageStore`] over `chat_messages`.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn find_message(&self, id: DbId) -> Result<Option<MessageRecord>, CoreError> {
        let row = ChatMessageRepo::find_by_id(&self.pool, id)
            .await
            .map_err(|e| CoreError::store("load chat message", e))?;
        Ok(row.map(MessageRecord::from))
    }

    async fn count_active_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError> {
        ChatMessageRepo::count_active_since(&self.pool, conversation_id, since)
            .await
            .map_err(|e| CoreError::store("count chat messages", e))
    }

    async fn deactivate_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError> {
        let changed = ChatMessageRepo::deactivate_since(&self.pool, conversation_id, since)
            .await
            .map_err(|e| CoreError::store("soft-delete chat messages", e))?;
        Ok(changed as i64)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// [`ActivityLedger`] over `activity_logs`.
#[derive(Clone)]
pub struct PgActivityLedger {
    pool: PgPool,
}

impl PgActivityLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLedger for PgActivityLedger {
    async fn list_ai_activities(
        &self,
        scope: &LedgerScope,
    ) -> Result<Vec<ActivityRecord>, CoreError> {
        let rows = ActivityRepo::list_ai_in_scope(&self.pool, scope)
            .await
            .map_err(|e| CoreError::store("query activity ledger", e))?;
        Ok(rows.into_iter().map(ActivityRecord::from).collect())
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// [`PageDirectory`] over `pages`.
#[derive(Clone)]
pub struct PgPageDirectory {
    pool: PgPool,
}

impl PgPageDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageDirectory for PgPageDirectory {
    async fn drive_for_page(&self, page_id: DbId) -> Result<Option<DbId>, CoreError> {
        PageRepo::drive_id_for(&self.pool, page_id)
            .await
            .map_err(|e| CoreError::store("resolve page drive", e))
    }
}
