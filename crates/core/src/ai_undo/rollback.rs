//! Rollback execution: message soft-delete, then per-entity reversal.
//!
//! ```text
//! VALIDATING -> SCOPING -> DELETING_MESSAGES -> REVERSING_ACTIVITIES -> AGGREGATING -> DONE
//!                                            \_ (messages_only) ______/
//! ```
//!
//! Only the message soft-delete may abort the run. Every later failure is
//! confined to its unit of work and reported in the result. A unit of work
//! is one entity write plus the `undo` ledger entry recording it, applied
//! together by the entity's restorer.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use crate::activity::SnapshotShape;
use crate::error::CoreError;
use crate::types::DbId;

use super::report::{ResultAggregator, UnitOutcome};
use super::restore::{RestoreOutcome, RestoreRequest, RestorerRegistry};
use super::scope::activity_scope;
use super::store::{ActivityLedger, ActivityRecord, MessageStore, NewActivity};
use super::types::{UndoCheckpoint, UndoConfig, UndoError, UndoErrorReason, UndoMode, UndoResult};

/// Execution phases, logged as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    Validating,
    Scoping,
    DeletingMessages,
    ReversingActivities,
    Aggregating,
    Done,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Scoping => "scoping",
            Self::DeletingMessages => "deleting_messages",
            Self::ReversingActivities => "reversing_activities",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
        }
    }
}

/// Group a newest-first scope by `(entity_type, entity_id)`.
///
/// Returns indices into `activities`. Groups appear in order of their newest
/// entry and each group keeps newest-first order, so running groups
/// concurrently never reorders reversals of the same entity.
pub fn partition_by_entity(activities: &[ActivityRecord]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<(&str, DbId), usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, activity) in activities.iter().enumerate() {
        let key = (activity.entity_type.as_str(), activity.entity_id);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }

    groups
}

/// Drives one execute call against the collaborators.
pub struct RollbackExecutor<'a> {
    pub messages: &'a dyn MessageStore,
    pub ledger: &'a dyn ActivityLedger,
    pub restorers: &'a RestorerRegistry,
    pub config: UndoConfig,
}

impl RollbackExecutor<'_> {
    pub async fn run(
        &self,
        checkpoint: &UndoCheckpoint,
        mode: UndoMode,
        actor: Option<DbId>,
    ) -> Result<UndoResult, CoreError> {
        let message_id = checkpoint.origin_message_id;
        let enter = |phase: ExecutionPhase| {
            tracing::debug!(message_id, phase = phase.as_str(), "AI undo phase");
        };

        // Mode and checkpoint arrive already parsed and resolved.
        enter(ExecutionPhase::Validating);

        // messages_only never reads the ledger.
        enter(ExecutionPhase::Scoping);
        let activities = if mode.reverses_activities() {
            activity_scope(self.ledger, checkpoint).await?
        } else {
            Vec::new()
        };

        enter(ExecutionPhase::DeletingMessages);
        let messages_deleted = self
            .messages
            .deactivate_since(checkpoint.conversation_id, checkpoint.cutoff)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    message_id,
                    conversation_id = checkpoint.conversation_id,
                    error = %e,
                    "AI undo aborted: message soft-delete failed"
                );
            })?;

        let mut aggregator = ResultAggregator::new(messages_deleted);

        if mode.reverses_activities() && !activities.is_empty() {
            enter(ExecutionPhase::ReversingActivities);
            let partitions = partition_by_entity(&activities);
            let outcomes: Vec<Vec<UnitOutcome>> = stream::iter(partitions)
                .map(|indices| self.reverse_partition(indices, &activities, actor))
                .buffer_unordered(self.config.reversal_concurrency)
                .collect()
                .await;
            aggregator.extend(outcomes.into_iter().flatten());
        }

        enter(ExecutionPhase::Aggregating);
        let result = aggregator.finish();

        enter(ExecutionPhase::Done);
        Ok(result)
    }

    /// Reverse one entity's entries strictly newest-first.
    async fn reverse_partition(
        &self,
        indices: Vec<usize>,
        activities: &[ActivityRecord],
        actor: Option<DbId>,
    ) -> Vec<UnitOutcome> {
        let mut outcomes = Vec::with_capacity(indices.len());
        for index in indices {
            outcomes.push(self.reverse_one(index, &activities[index], actor).await);
        }
        outcomes
    }

    async fn reverse_one(
        &self,
        index: usize,
        activity: &ActivityRecord,
        actor: Option<DbId>,
    ) -> UnitOutcome {
        let undo = NewActivity::undo_of(activity, actor);
        let request = RestoreRequest {
            before: activity.before_state.as_ref(),
            after: activity.after_state.as_ref(),
            undo: &undo,
        };

        if SnapshotShape::of(request.before, request.after) == SnapshotShape::Missing {
            return failed_unit(
                index,
                activity,
                UndoErrorReason::MissingSnapshot,
                "Entry has no before or after state".to_string(),
            );
        }

        let Some(restorer) = self.restorers.get(&activity.entity_type) else {
            return failed_unit(
                index,
                activity,
                UndoErrorReason::RestorerNotFound,
                format!("No restorer registered for '{}'", activity.entity_type),
            );
        };

        match restorer.restore(activity.entity_id, request).await {
            Ok(RestoreOutcome::Restored) => {
                tracing::debug!(
                    activity_id = activity.id,
                    entity_type = %activity.entity_type,
                    entity_id = activity.entity_id,
                    "Activity reversed"
                );
                UnitOutcome {
                    index,
                    rolled_back: true,
                    error: None,
                }
            }
            Ok(RestoreOutcome::Conflict { fields }) => failed_unit(
                index,
                activity,
                UndoErrorReason::StateDrift,
                format!("Changed since this action: {}", fields.join(", ")),
            ),
            Ok(RestoreOutcome::NotFound) => failed_unit(
                index,
                activity,
                UndoErrorReason::NotFound,
                "Entity no longer exists".to_string(),
            ),
            Err(e) => failed_unit(index, activity, UndoErrorReason::RestoreFailed, e.to_string()),
        }
    }
}

fn unit_error(activity: &ActivityRecord, reason: UndoErrorReason, detail: String) -> UndoError {
    UndoError {
        activity_id: activity.id,
        entity_id: activity.entity_id,
        entity_type: activity.entity_type.clone(),
        reason,
        detail,
    }
}

fn failed_unit(
    index: usize,
    activity: &ActivityRecord,
    reason: UndoErrorReason,
    detail: String,
) -> UnitOutcome {
    tracing::warn!(
        activity_id = activity.id,
        entity_type = %activity.entity_type,
        entity_id = activity.entity_id,
        reason = reason.as_str(),
        detail = %detail,
        "Activity could not be reversed"
    );
    UnitOutcome {
        index,
        rolled_back: false,
        error: Some(unit_error(activity, reason, detail)),
    }
}
