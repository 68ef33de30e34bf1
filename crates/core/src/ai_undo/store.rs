//! Persistence collaborators consumed by the undo engine.
//!
//! The engine only ever talks to storage through these traits. Every query
//! is scoped by conversation, page or drive so unrelated conversations never
//! interfere with one another.

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::{action_types, undo_description};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The subset of a chat message row the engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: DbId,
    pub conversation_id: DbId,
    pub page_id: DbId,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A ledger entry as read back by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub id: DbId,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub page_id: Option<DbId>,
    pub drive_id: Option<DbId>,
    pub conversation_id: Option<DbId>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

/// Predicate for the AI activity range query.
///
/// Matches `is_ai_action` entries created at or after `since`, attached to
/// the page or anywhere in the drive, and either unattributed or attributed
/// to the conversation. Entries already reversed by an `undo` entry are
/// excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerScope {
    pub page_id: DbId,
    pub drive_id: DbId,
    pub conversation_id: DbId,
    pub since: Timestamp,
}

/// A ledger entry to append. Appending never edits an existing row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub user_id: Option<DbId>,
    pub page_id: Option<DbId>,
    pub drive_id: Option<DbId>,
    pub conversation_id: Option<DbId>,
    pub is_ai_action: bool,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub changes: Option<Value>,
    pub description: Option<String>,
    pub undoes_activity_id: Option<DbId>,
}

impl NewActivity {
    /// The `undo` entry recording the reversal of `original` by `actor`.
    ///
    /// Snapshots are swapped: the new entry moves the entity from the
    /// original's after-state back to its before-state.
    pub fn undo_of(original: &ActivityRecord, actor: Option<DbId>) -> Self {
        Self {
            action_type: action_types::UNDO.to_string(),
            entity_type: original.entity_type.clone(),
            entity_id: original.entity_id,
            user_id: actor,
            page_id: original.page_id,
            drive_id: original.drive_id,
            conversation_id: original.conversation_id,
            is_ai_action: false,
            before_state: original.after_state.clone(),
            after_state: original.before_state.clone(),
            changes: None,
            description: Some(undo_description(
                original.description.as_deref(),
                &original.action_type,
            )),
            undoes_activity_id: Some(original.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Chat message lookups and the batch soft-delete.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Load a message regardless of its `is_active` flag.
    async fn find_message(&self, id: DbId) -> Result<Option<MessageRecord>, CoreError>;

    /// Count active messages in the conversation created at or after `since`.
    async fn count_active_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError>;

    /// Soft-delete every active message in the conversation created at or
    /// after `since` in one statement. Returns the number of rows changed.
    async fn deactivate_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError>;
}

/// Range query over the activity ledger.
///
/// `undo` entries are appended by the entity restorers, inside the same
/// unit of work as the entity write they record.
#[async_trait]
pub trait ActivityLedger: Send + Sync {
    /// AI entries matching `scope`, in any order.
    async fn list_ai_activities(&self, scope: &LedgerScope)
        -> Result<Vec<ActivityRecord>, CoreError>;
}

/// Resolves the drive that owns a page.
#[async_trait]
pub trait PageDirectory: Send + Sync {
    /// `None` when the page does not exist.
    async fn drive_for_page(&self, page_id: DbId) -> Result<Option<DbId>, CoreError>;
}
