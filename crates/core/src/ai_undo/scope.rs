//! Undo scope calculation (preview). Read-only and safely retryable.

use std::cmp::Reverse;

use crate::error::CoreError;

use super::store::{ActivityLedger, ActivityRecord, LedgerScope, MessageStore};
use super::types::{ActivitySummary, UndoCheckpoint, UndoPreview};

/// Ledger predicate for a checkpoint.
pub fn ledger_scope(checkpoint: &UndoCheckpoint) -> LedgerScope {
    LedgerScope {
        page_id: checkpoint.page_id,
        drive_id: checkpoint.drive_id,
        conversation_id: checkpoint.conversation_id,
        since: checkpoint.cutoff,
    }
}

/// Sort newest first; ties on `created_at` fall back to the higher id.
pub fn sort_newest_first(activities: &mut [ActivityRecord]) {
    activities.sort_by_key(|a| Reverse((a.created_at, a.id)));
}

pub fn summarize(activity: &ActivityRecord) -> ActivitySummary {
    ActivitySummary {
        id: activity.id,
        action_type: activity.action_type.clone(),
        entity_type: activity.entity_type.clone(),
        description: activity.description.clone(),
    }
}

/// AI ledger entries in scope of the checkpoint, newest first.
pub async fn activity_scope(
    ledger: &dyn ActivityLedger,
    checkpoint: &UndoCheckpoint,
) -> Result<Vec<ActivityRecord>, CoreError> {
    let mut activities = ledger.list_ai_activities(&ledger_scope(checkpoint)).await?;
    sort_newest_first(&mut activities);
    Ok(activities)
}

/// Count the messages and list the activities an execute would touch.
pub async fn compute_preview(
    messages: &dyn MessageStore,
    ledger: &dyn ActivityLedger,
    checkpoint: &UndoCheckpoint,
) -> Result<UndoPreview, CoreError> {
    let messages_affected = messages
        .count_active_since(checkpoint.conversation_id, checkpoint.cutoff)
        .await?;

    let activities_affected = activity_scope(ledger, checkpoint)
        .await?
        .iter()
        .map(summarize)
        .collect();

    Ok(UndoPreview {
        messages_affected,
        activities_affected,
    })
}
