//! AI undo engine.
//!
//! Reverses an AI assistant's conversational turn: either just the chat
//! messages from a checkpoint onward, or those messages plus every
//! workspace change the AI recorded in the activity ledger since then.
//!
//! - [`checkpoint`] turns a message id into an [`UndoCheckpoint`].
//! - [`scope`] computes the read-only [`UndoPreview`].
//! - [`rollback`] soft-deletes messages and reverses ledger entries
//!   newest-first through the [`RestorerRegistry`].
//! - [`report`] folds per-unit outcomes into one [`UndoResult`].
//!
//! Reversal is best-effort and per-entity: there is no cross-entity
//! transaction, but each entity write is persisted together with the
//! `undo` entry that records it. Callers must serialize concurrent undo requests against
//! the same conversation; the engine takes no lock.

pub mod checkpoint;
pub mod report;
pub mod restore;
pub mod rollback;
pub mod scope;
pub mod store;
pub mod types;

#[cfg(test)]
mod fakes;

use std::sync::Arc;

use crate::error::CoreError;
use crate::types::DbId;

pub use report::UndoOutcome;
pub use restore::{EntityRestorer, RestoreOutcome, RestoreRequest, RestorerRegistry};
pub use store::{ActivityLedger, MessageStore, PageDirectory};
pub use types::{
    ActivitySummary, UndoCheckpoint, UndoConfig, UndoError, UndoErrorReason, UndoMode,
    UndoPreview, UndoResult,
};

use rollback::RollbackExecutor;

/// Entry point for preview and execute.
///
/// Cheaply shareable behind an `Arc`; holds no per-request state.
pub struct UndoEngine {
    messages: Arc<dyn MessageStore>,
    ledger: Arc<dyn ActivityLedger>,
    pages: Arc<dyn PageDirectory>,
    restorers: RestorerRegistry,
    config: UndoConfig,
}

impl UndoEngine {
    pub fn new(
        messages: Arc<dyn MessageStore>,
        ledger: Arc<dyn ActivityLedger>,
        pages: Arc<dyn PageDirectory>,
        restorers: RestorerRegistry,
        config: UndoConfig,
    ) -> Self {
        Self {
            messages,
            ledger,
            pages,
            restorers,
            config,
        }
    }

    pub fn restorers(&self) -> &RestorerRegistry {
        &self.restorers
    }

    pub async fn resolve_checkpoint(&self, message_id: DbId) -> Result<UndoCheckpoint, CoreError> {
        checkpoint::resolve_checkpoint(self.messages.as_ref(), self.pages.as_ref(), message_id)
            .await
    }

    /// Resolve then preview.
    pub async fn preview(&self, message_id: DbId) -> Result<UndoPreview, CoreError> {
        let checkpoint = self.resolve_checkpoint(message_id).await?;
        self.preview_checkpoint(&checkpoint).await
    }

    /// Compute the undo scope without mutating anything.
    pub async fn preview_checkpoint(
        &self,
        checkpoint: &UndoCheckpoint,
    ) -> Result<UndoPreview, CoreError> {
        let preview =
            scope::compute_preview(self.messages.as_ref(), self.ledger.as_ref(), checkpoint)
                .await?;

        tracing::info!(
            message_id = checkpoint.origin_message_id,
            conversation_id = checkpoint.conversation_id,
            page_id = checkpoint.page_id,
            messages_affected = preview.messages_affected,
            activities_affected = preview.activities_affected.len(),
            "AI undo preview"
        );

        Ok(preview)
    }

    /// Resolve then execute.
    pub async fn execute(
        &self,
        message_id: DbId,
        mode: UndoMode,
        actor: Option<DbId>,
    ) -> Result<UndoResult, CoreError> {
        let checkpoint = self.resolve_checkpoint(message_id).await?;
        self.execute_checkpoint(&checkpoint, mode, actor).await
    }

    /// Run the rollback for an already-resolved checkpoint.
    ///
    /// Returns `Err` only when nothing was mutated or when the message
    /// soft-delete itself failed. Every other failure is reported in
    /// [`UndoResult::errors`] alongside exact counts.
    pub async fn execute_checkpoint(
        &self,
        checkpoint: &UndoCheckpoint,
        mode: UndoMode,
        actor: Option<DbId>,
    ) -> Result<UndoResult, CoreError> {
        let executor = RollbackExecutor {
            messages: self.messages.as_ref(),
            ledger: self.ledger.as_ref(),
            restorers: &self.restorers,
            config: self.config,
        };
        let result = executor.run(checkpoint, mode, actor).await?;

        tracing::info!(
            message_id = checkpoint.origin_message_id,
            conversation_id = checkpoint.conversation_id,
            page_id = checkpoint.page_id,
            mode = mode.as_str(),
            messages_deleted = result.messages_deleted,
            activities_rolled_back = result.activities_rolled_back,
            errors = result.errors.len(),
            success = result.success,
            "AI undo executed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::fakes::*;
    use super::*;

    const PAGE: DbId = 10;
    const DRIVE: DbId = 1;
    const CONV: DbId = 100;

    struct Harness {
        messages: Arc<FakeMessages>,
        ledger: Arc<FakeLedger>,
        entities: EntityMap,
        engine: UndoEngine,
    }

    fn harness_with(config: UndoConfig, types: &[&'static str]) -> Harness {
        let messages = Arc::new(FakeMessages::default());
        let ledger = Arc::new(FakeLedger::default());
        let pages = Arc::new(FakePages::default().with_page(PAGE, DRIVE).with_page(11, DRIVE));
        let entities = EntityMap::default();

        let mut restorers = RestorerRegistry::new();
        for &entity_type in types {
            restorers.register(Arc::new(FakeRestorer {
                entity_type,
                entities: Arc::clone(&entities),
                ledger: Arc::clone(&ledger),
            }));
        }

        let engine = UndoEngine::new(
            messages.clone(),
            ledger.clone(),
            pages,
            restorers,
            config,
        );
        Harness {
            messages,
            ledger,
            entities,
            engine,
        }
    }

    fn harness() -> Harness {
        harness_with(UndoConfig::default(), &["page", "drive_member"])
    }

    /// M3 (AI, t=100), M4 (user, t=110), M5 (AI, t=120), plus an earlier M2.
    fn seed_conversation(h: &Harness) {
        h.messages.add(2, CONV, PAGE, 90);
        h.messages.add(3, CONV, PAGE, 100);
        h.messages.add(4, CONV, PAGE, 110);
        h.messages.add(5, CONV, PAGE, 120);
    }

    fn set_entity(h: &Harness, entity_type: &str, id: DbId, value: serde_json::Value) {
        h.entities
            .lock()
            .unwrap()
            .insert((entity_type.to_string(), id), value);
    }

    fn entity(h: &Harness, entity_type: &str, id: DbId) -> Option<serde_json::Value> {
        h.entities
            .lock()
            .unwrap()
            .get(&(entity_type.to_string(), id))
            .cloned()
    }

    #[tokio::test]
    async fn messages_only_soft_deletes_from_checkpoint() {
        let h = harness();
        seed_conversation(&h);

        let preview = h.engine.preview(3).await.unwrap();
        assert_eq!(preview.messages_affected, 3);

        let result = h
            .engine
            .execute(3, UndoMode::MessagesOnly, Some(7))
            .await
            .unwrap();

        assert_eq!(
            result,
            UndoResult {
                success: true,
                messages_deleted: 3,
                activities_rolled_back: 0,
                errors: vec![],
            }
        );
        assert!(h.messages.is_active(2));
        assert!(!h.messages.is_active(3));
        assert!(!h.messages.is_active(4));
        assert!(!h.messages.is_active(5));
    }

    #[tokio::test]
    async fn messages_only_never_reads_the_ledger() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "new"}));

        h.engine.execute(3, UndoMode::MessagesOnly, None).await.unwrap();

        assert_eq!(h.ledger.reads.load(Ordering::SeqCst), 0);
        assert_eq!(h.ledger.len(), 1);
        assert_eq!(entity(&h, "page", PAGE), Some(json!({"content": "new"})));
    }

    #[tokio::test]
    async fn messages_and_changes_restores_page_and_appends_undo() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, Some(CONV), 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"title": "Notes", "content": "new"}));

        let preview = h.engine.preview(3).await.unwrap();
        assert_eq!(preview.messages_affected, 3);
        assert_eq!(preview.activities_affected.len(), 1);
        assert_eq!(preview.activities_affected[0].id, 1);

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, Some(7))
            .await
            .unwrap();

        assert_eq!(
            result,
            UndoResult {
                success: true,
                messages_deleted: 3,
                activities_rolled_back: 1,
                errors: vec![],
            }
        );
        assert_eq!(
            entity(&h, "page", PAGE),
            Some(json!({"title": "Notes", "content": "old"}))
        );

        let undo = h.ledger.undo_rows();
        assert_eq!(undo.len(), 1);
        assert_eq!(undo[0].undoes, Some(1));
        assert_eq!(undo[0].record.action_type, "undo");
        assert_eq!(undo[0].record.before_state, Some(json!({"content": "new"})));
        assert_eq!(undo[0].record.after_state, Some(json!({"content": "old"})));
        assert_eq!(undo[0].user_id, Some(7));
        assert!(!undo[0].is_ai_action);

        // The original entry is untouched.
        let rows = h.ledger.rows.lock().unwrap();
        assert_eq!(rows[0].record.after_state, Some(json!({"content": "new"})));
    }

    #[tokio::test]
    async fn preview_is_idempotent() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "a"})),
            Some(json!({"content": "b"})),
        );

        let first = h.engine.preview(3).await.unwrap();
        let second = h.engine.preview(3).await.unwrap();
        assert_eq!(first, second);
        assert!(h.messages.is_active(3));
    }

    #[tokio::test]
    async fn earlier_checkpoint_never_sees_fewer_messages() {
        let h = harness();
        seed_conversation(&h);

        let counts: Vec<i64> = futures::future::join_all(
            [2, 3, 4, 5].map(|id| h.engine.preview(id)),
        )
        .await
        .into_iter()
        .map(|p| p.unwrap().messages_affected)
        .collect();

        assert_eq!(counts, vec![4, 3, 2, 1]);
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test]
    async fn chained_actions_restore_to_state_before_first() {
        let h = harness();
        h.messages.add(1, CONV, PAGE, 5);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 10,
            Some(json!({"content": "a"})),
            Some(json!({"content": "b"})),
        );
        h.ledger.ai_action(
            2, "page", PAGE, PAGE, DRIVE, None, 20,
            Some(json!({"content": "b"})),
            Some(json!({"content": "c"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "c"}));

        let preview = h.engine.preview(1).await.unwrap();
        let ids: Vec<DbId> = preview.activities_affected.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 1]);

        let result = h
            .engine
            .execute(1, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.activities_rolled_back, 2);
        assert_eq!(entity(&h, "page", PAGE), Some(json!({"content": "a"})));
        let undone: Vec<Option<DbId>> = h.ledger.undo_rows().iter().map(|r| r.undoes).collect();
        assert_eq!(undone, vec![Some(2), Some(1)]);
    }

    #[tokio::test]
    async fn missing_entity_is_reported_and_siblings_continue() {
        let h = harness();
        seed_conversation(&h);
        for (id, entity_id, secs) in [(1, 21, 101), (2, 22, 102), (3, 23, 103)] {
            h.ledger.ai_action(
                id, "page", entity_id, PAGE, DRIVE, None, secs,
                Some(json!({"title": "before"})),
                Some(json!({"title": "after"})),
            );
        }
        set_entity(&h, "page", 21, json!({"title": "after"}));
        set_entity(&h, "page", 23, json!({"title": "after"}));

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.activities_rolled_back, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].entity_id, 22);
        assert_eq!(result.errors[0].reason, UndoErrorReason::NotFound);
        assert_eq!(result.outcome(), UndoOutcome::PartialSuccess);
        assert_eq!(entity(&h, "page", 21), Some(json!({"title": "before"})));
        assert_eq!(entity(&h, "page", 23), Some(json!({"title": "before"})));
    }

    #[tokio::test]
    async fn human_edit_after_ai_action_is_state_drift() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "edited by a human"}));

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert_eq!(result.messages_deleted, 3);
        assert_eq!(result.activities_rolled_back, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].reason, UndoErrorReason::StateDrift);
        assert!(result.errors[0].detail.contains("content"));
        assert_eq!(
            entity(&h, "page", PAGE),
            Some(json!({"content": "edited by a human"}))
        );
        assert!(h.ledger.undo_rows().is_empty());
    }

    #[tokio::test]
    async fn failed_message_delete_aborts_before_any_reversal() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "new"}));
        h.messages.fail_deactivate.store(true, Ordering::SeqCst);

        let err = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Internal(_));
        assert_eq!(entity(&h, "page", PAGE), Some(json!({"content": "new"})));
        assert!(h.ledger.undo_rows().is_empty());
        assert!(h.messages.is_active(3));
    }

    #[tokio::test]
    async fn unknown_message_is_not_found() {
        let h = harness();
        let err = h.engine.preview(999).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "ChatMessage", id: 999 });

        let err = h
            .engine
            .execute(999, UndoMode::MessagesOnly, None)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn message_on_missing_page_is_not_found() {
        let h = harness();
        h.messages.add(1, CONV, 404, 10);
        let err = h.engine.resolve_checkpoint(1).await.unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Page", id: 404 });
    }

    #[tokio::test]
    async fn checkpoint_carries_scope_and_cutoff() {
        let h = harness();
        seed_conversation(&h);
        let checkpoint = h.engine.resolve_checkpoint(4).await.unwrap();
        assert_eq!(
            checkpoint,
            UndoCheckpoint {
                origin_message_id: 4,
                conversation_id: CONV,
                page_id: PAGE,
                drive_id: DRIVE,
                cutoff: at(110),
            }
        );
    }

    #[tokio::test]
    async fn unregistered_entity_type_is_restorer_not_found() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "calendar_event", 5, PAGE, DRIVE, None, 105,
            Some(json!({"title": "a"})),
            Some(json!({"title": "b"})),
        );

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].reason, UndoErrorReason::RestorerNotFound);
        assert_eq!(result.errors[0].entity_type, "calendar_event");
    }

    #[tokio::test]
    async fn entry_without_snapshots_is_missing_snapshot() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(1, "page", PAGE, PAGE, DRIVE, None, 105, None, None);

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert_eq!(result.errors[0].reason, UndoErrorReason::MissingSnapshot);
        assert_eq!(result.activities_rolled_back, 0);
    }

    #[tokio::test]
    async fn created_and_deleted_entities_are_reversed() {
        let h = harness();
        seed_conversation(&h);
        // AI added a member, and removed another.
        h.ledger.ai_action(
            1, "drive_member", 31, PAGE, DRIVE, None, 101,
            None,
            Some(json!({"role": "member"})),
        );
        h.ledger.ai_action(
            2, "drive_member", 32, PAGE, DRIVE, None, 102,
            Some(json!({"role": "admin"})),
            None,
        );
        set_entity(&h, "drive_member", 31, json!({"role": "member"}));

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(entity(&h, "drive_member", 31), None);
        assert_eq!(entity(&h, "drive_member", 32), Some(json!({"role": "admin"})));
    }

    #[tokio::test]
    async fn second_execute_skips_already_reversed_entries() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "new"}));

        let first = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();
        assert!(first.success);

        assert!(h.engine.preview(3).await.unwrap().activities_affected.is_empty());

        let second = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();
        assert_eq!(
            second,
            UndoResult {
                success: true,
                messages_deleted: 0,
                activities_rolled_back: 0,
                errors: vec![],
            }
        );
        assert_eq!(h.ledger.undo_rows().len(), 1);
    }

    #[tokio::test]
    async fn messages_only_leaves_ledger_scope_for_later_checkpoints() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 115,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );

        let before = h.engine.preview(2).await.unwrap().activities_affected;
        h.engine.execute(4, UndoMode::MessagesOnly, None).await.unwrap();
        let after = h.engine.preview(2).await.unwrap().activities_affected;

        assert_eq!(before, after);
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn other_conversations_are_out_of_scope() {
        let h = harness();
        seed_conversation(&h);
        h.messages.add(50, 200, PAGE, 130);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, Some(200), 131,
            Some(json!({"content": "x"})),
            Some(json!({"content": "y"})),
        );
        h.ledger.ai_action(
            2, "page", 11, 11, DRIVE, Some(CONV), 121,
            Some(json!({"content": "p"})),
            Some(json!({"content": "q"})),
        );

        let preview = h.engine.preview(3).await.unwrap();
        assert_eq!(preview.messages_affected, 3);
        let ids: Vec<DbId> = preview.activities_affected.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2], "same-drive entry from this conversation only");

        h.engine.execute(3, UndoMode::MessagesOnly, None).await.unwrap();
        assert!(h.messages.is_active(50));
    }

    #[tokio::test]
    async fn failed_undo_append_leaves_entity_and_scope_intact() {
        let h = harness();
        seed_conversation(&h);
        h.ledger.ai_action(
            1, "page", PAGE, PAGE, DRIVE, None, 105,
            Some(json!({"content": "old"})),
            Some(json!({"content": "new"})),
        );
        set_entity(&h, "page", PAGE, json!({"content": "new"}));
        h.ledger.fail_append.store(true, Ordering::SeqCst);

        let result = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.messages_deleted, 3);
        assert_eq!(result.activities_rolled_back, 0);
        assert_eq!(result.errors[0].reason, UndoErrorReason::RestoreFailed);
        assert_eq!(entity(&h, "page", PAGE), Some(json!({"content": "new"})));
        assert!(h.ledger.undo_rows().is_empty());

        // The entry is still in scope and reverses cleanly once the ledger
        // accepts writes again.
        h.ledger.fail_append.store(false, Ordering::SeqCst);
        let preview = h.engine.preview(3).await.unwrap();
        assert_eq!(preview.activities_affected.len(), 1);

        let retry = h
            .engine
            .execute(3, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();
        assert!(retry.success);
        assert_eq!(retry.activities_rolled_back, 1);
        assert_eq!(entity(&h, "page", PAGE), Some(json!({"content": "old"})));
        assert_eq!(h.ledger.undo_rows().len(), 1);
    }

    #[tokio::test]
    async fn parallel_reversal_keeps_per_entity_order() {
        let h = harness_with(UndoConfig::new(8), &["page"]);
        h.messages.add(1, CONV, PAGE, 5);

        let mut next_id = 1;
        for entity_id in 100..110 {
            for (step, secs) in [(0, 10), (1, 20), (2, 30)] {
                h.ledger.ai_action(
                    next_id, "page", entity_id, PAGE, DRIVE, None, secs + entity_id,
                    Some(json!({"v": step})),
                    Some(json!({"v": step + 1})),
                );
                next_id += 1;
            }
            set_entity(&h, "page", entity_id, json!({"v": 3}));
        }

        let result = h
            .engine
            .execute(1, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.activities_rolled_back, 30);
        for entity_id in 100..110 {
            assert_eq!(entity(&h, "page", entity_id), Some(json!({"v": 0})));
        }
    }

    #[tokio::test]
    async fn nothing_in_scope_and_no_messages_is_success() {
        let h = harness();
        h.messages.add(1, CONV, PAGE, 10);
        h.messages.rows.lock().unwrap()[0].is_active = false;

        let result = h
            .engine
            .execute(1, UndoMode::MessagesAndChanges, None)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.messages_deleted, 0);
        assert_eq!(result.outcome(), UndoOutcome::Success);
    }
}
