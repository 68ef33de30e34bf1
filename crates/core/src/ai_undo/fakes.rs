//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::activity::{drifted_fields, SnapshotShape};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

use super::restore::{EntityRestorer, RestoreOutcome, RestoreRequest};
use super::store::{
    ActivityLedger, ActivityRecord, LedgerScope, MessageRecord, MessageStore, NewActivity,
    PageDirectory,
};

pub fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(secs, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMessages {
    pub rows: Mutex<Vec<MessageRecord>>,
    pub fail_deactivate: AtomicBool,
}

impl FakeMessages {
    pub fn add(&self, id: DbId, conversation_id: DbId, page_id: DbId, secs: i64) {
        self.rows.lock().unwrap().push(MessageRecord {
            id,
            conversation_id,
            page_id,
            is_active: true,
            created_at: at(secs),
        });
    }

    pub fn is_active(&self, id: DbId) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.is_active)
            .unwrap()
    }
}

#[async_trait]
impl MessageStore for FakeMessages {
    async fn find_message(&self, id: DbId) -> Result<Option<MessageRecord>, CoreError> {
        Ok(self.rows.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn count_active_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.is_active && m.created_at >= since)
            .count() as i64)
    }

    async fn deactivate_since(
        &self,
        conversation_id: DbId,
        since: Timestamp,
    ) -> Result<i64, CoreError> {
        if self.fail_deactivate.load(Ordering::SeqCst) {
            return Err(CoreError::Internal("connection reset".into()));
        }
        let mut changed = 0;
        for m in self.rows.lock().unwrap().iter_mut() {
            if m.conversation_id == conversation_id && m.is_active && m.created_at >= since {
                m.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub record: ActivityRecord,
    pub is_ai_action: bool,
    pub user_id: Option<DbId>,
    pub undoes: Option<DbId>,
}

#[derive(Default)]
pub struct FakeLedger {
    pub rows: Mutex<Vec<LedgerRow>>,
    pub reads: AtomicUsize,
    pub fail_append: AtomicBool,
}

impl FakeLedger {
    /// Record an AI action on a page-scoped entity.
    #[allow(clippy::too_many_arguments)]
    pub fn ai_action(
        &self,
        id: DbId,
        entity_type: &str,
        entity_id: DbId,
        page_id: DbId,
        drive_id: DbId,
        conversation_id: Option<DbId>,
        secs: i64,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        self.rows.lock().unwrap().push(LedgerRow {
            record: ActivityRecord {
                id,
                action_type: "update".into(),
                entity_type: entity_type.into(),
                entity_id,
                page_id: Some(page_id),
                drive_id: Some(drive_id),
                conversation_id,
                before_state: before,
                after_state: after,
                description: Some(format!("AI changed {entity_type} {entity_id}")),
                created_at: at(secs),
            },
            is_ai_action: true,
            user_id: None,
            undoes: None,
        });
    }

    pub fn undo_rows(&self) -> Vec<LedgerRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.undoes.is_some())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Append an entry; fails while `fail_append` is set.
    pub fn append(&self, entry: &NewActivity) -> Result<DbId, CoreError> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(CoreError::Internal("ledger unavailable".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|r| r.record.id).max().unwrap_or(0) + 1;
        rows.push(LedgerRow {
            record: ActivityRecord {
                id,
                action_type: entry.action_type.clone(),
                entity_type: entry.entity_type.clone(),
                entity_id: entry.entity_id,
                page_id: entry.page_id,
                drive_id: entry.drive_id,
                conversation_id: entry.conversation_id,
                before_state: entry.before_state.clone(),
                after_state: entry.after_state.clone(),
                description: entry.description.clone(),
                created_at: Utc::now(),
            },
            is_ai_action: entry.is_ai_action,
            user_id: entry.user_id,
            undoes: entry.undoes_activity_id,
        });
        Ok(id)
    }
}

#[async_trait]
impl ActivityLedger for FakeLedger {
    async fn list_ai_activities(
        &self,
        scope: &LedgerScope,
    ) -> Result<Vec<ActivityRecord>, CoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.lock().unwrap();
        let undone: Vec<DbId> = rows.iter().filter_map(|r| r.undoes).collect();
        Ok(rows
            .iter()
            .filter(|r| r.is_ai_action && r.record.created_at >= scope.since)
            .filter(|r| {
                r.record.page_id == Some(scope.page_id) || r.record.drive_id == Some(scope.drive_id)
            })
            .filter(|r| r.record.conversation_id.is_none_or(|c| c == scope.conversation_id))
            .filter(|r| !undone.contains(&r.record.id))
            .map(|r| r.record.clone())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePages {
    pub drives: HashMap<DbId, DbId>,
}

impl FakePages {
    pub fn with_page(mut self, page_id: DbId, drive_id: DbId) -> Self {
        self.drives.insert(page_id, drive_id);
        self
    }
}

#[async_trait]
impl PageDirectory for FakePages {
    async fn drive_for_page(&self, page_id: DbId) -> Result<Option<DbId>, CoreError> {
        Ok(self.drives.get(&page_id).copied())
    }
}

// ---------------------------------------------------------------------------
// Entities + restorer
// ---------------------------------------------------------------------------

pub type EntityMap = Arc<Mutex<HashMap<(String, DbId), Value>>>;

/// Applies snapshots to an in-memory map, with the same drift rules the
/// Postgres restorers follow. The entity only changes once the `undo` entry
/// has been appended to `ledger`.
pub struct FakeRestorer {
    pub entity_type: &'static str,
    pub entities: EntityMap,
    pub ledger: Arc<FakeLedger>,
}

impl FakeRestorer {
    /// The entity's next value (`None` removes it), or the outcome that
    /// stops the restore.
    fn plan(
        current: Option<&Value>,
        request: &RestoreRequest<'_>,
    ) -> Result<Result<Option<Value>, RestoreOutcome>, CoreError> {
        match SnapshotShape::of(request.before, request.after) {
            SnapshotShape::Update | SnapshotShape::Created => {
                let Some(current) = current else {
                    return Ok(Err(RestoreOutcome::NotFound));
                };
                let after = request.after.cloned().unwrap_or(Value::Null);
                let fields = drifted_fields(&after, current, None);
                if !fields.is_empty() {
                    return Ok(Err(RestoreOutcome::Conflict { fields }));
                }
                Ok(Ok(match request.before {
                    Some(Value::Object(before)) => {
                        let mut merged = current.as_object().cloned().unwrap_or_default();
                        merged.extend(before.clone());
                        Some(Value::Object(merged))
                    }
                    _ => None,
                }))
            }
            SnapshotShape::Deleted => {
                if current.is_some() {
                    return Ok(Err(RestoreOutcome::Conflict {
                        fields: vec!["<exists>".into()],
                    }));
                }
                Ok(Ok(Some(request.before.cloned().unwrap_or(Value::Null))))
            }
            SnapshotShape::Missing => Err(CoreError::Validation("no snapshot".into())),
        }
    }
}

#[async_trait]
impl EntityRestorer for FakeRestorer {
    fn entity_type(&self) -> &str {
        self.entity_type
    }

    async fn restore(
        &self,
        entity_id: DbId,
        request: RestoreRequest<'_>,
    ) -> Result<RestoreOutcome, CoreError> {
        let key = (self.entity_type.to_string(), entity_id);
        let mut entities = self.entities.lock().unwrap();

        let next = match Self::plan(entities.get(&key), &request)? {
            Ok(next) => next,
            Err(outcome) => return Ok(outcome),
        };

        self.ledger.append(request.undo)?;
        match next {
            Some(value) => entities.insert(key, value),
            None => entities.remove(&key),
        };
        Ok(RestoreOutcome::Restored)
    }
}
