//! Snapshot restorers for the built-in entity types.
//!
//! Every built-in type is restored the same way: lock the live row, compare
//! it with the recorded after-state, and write the recorded before-state
//! back through `jsonb_populate_record`. Per-type differences (table name,
//! which columns may be written, soft delete) live in a [`SnapshotTable`].
//! The `undo` ledger entry is inserted in the same transaction, so a
//! reversal is never committed without its record.

use std::sync::Arc;

use async_trait::async_trait;
use pagespace_core::activity::{drifted_fields, entity_types};
use pagespace_core::ai_undo::restore::{
    EntityRestorer, RestoreOutcome, RestoreRequest, RestorerRegistry,
};
use pagespace_core::ai_undo::store::NewActivity;
use pagespace_core::error::CoreError;
use pagespace_core::types::DbId;
use serde_json::{json, Value};
use sqlx::{PgConnection, PgPool};

use crate::models::activity::CreateActivityLog;
use crate::repositories::ActivityRepo;

// ---------------------------------------------------------------------------
// Table descriptors
// ---------------------------------------------------------------------------

/// How one entity type maps onto its table.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotTable {
    pub entity_type: &'static str,
    pub table: &'static str,
    /// Columns a snapshot may write back. Also the only columns checked for
    /// drift.
    pub columns: &'static [&'static str],
    /// Rows are trashed via `is_trashed`/`trashed_at` instead of deleted.
    pub soft_delete: bool,
    /// Column set to `NOW()` on every write.
    pub touch_column: Option<&'static str>,
}

pub const PAGES: SnapshotTable = SnapshotTable {
    entity_type: entity_types::PAGE,
    table: "pages",
    columns: &["drive_id", "title", "content", "is_trashed", "trashed_at"],
    soft_delete: true,
    touch_column: Some("updated_at"),
};

pub const PAGE_PERMISSIONS: SnapshotTable = SnapshotTable {
    entity_type: entity_types::PAGE_PERMISSION,
    table: "page_permissions",
    columns: &["page_id", "user_id", "can_view", "can_edit", "can_share"],
    soft_delete: false,
    touch_column: None,
};

pub const DRIVE_MEMBERS: SnapshotTable = SnapshotTable {
    entity_type: entity_types::DRIVE_MEMBER,
    table: "drive_members",
    columns: &["drive_id", "user_id", "role"],
    soft_delete: false,
    touch_column: None,
};

pub const CALENDAR_EVENTS: SnapshotTable = SnapshotTable {
    entity_type: entity_types::CALENDAR_EVENT,
    table: "calendar_events",
    columns: &["drive_id", "page_id", "title", "description", "starts_at", "ends_at"],
    soft_delete: false,
    touch_column: None,
};

/// All built-in descriptors.
pub const BUILTIN_TABLES: [SnapshotTable; 4] =
    [PAGES, PAGE_PERMISSIONS, DRIVE_MEMBERS, CALENDAR_EVENTS];

impl SnapshotTable {
    /// Restorable columns present in `state`, in declaration order.
    fn restorable(&self, state: &Value) -> Vec<&'static str> {
        let Some(fields) = state.as_object() else {
            return Vec::new();
        };
        self.columns
            .iter()
            .copied()
            .filter(|col| fields.contains_key(*col))
            .collect()
    }

    fn is_trashed(&self, row: &Value) -> bool {
        self.soft_delete && row.get("is_trashed") == Some(&Value::Bool(true))
    }
}

/// Registry with a [`SnapshotRestorer`] for every built-in entity type.
pub fn default_registry(pool: &PgPool) -> RestorerRegistry {
    let mut registry = RestorerRegistry::new();
    for table in BUILTIN_TABLES {
        registry.register(Arc::new(SnapshotRestorer::new(pool.clone(), table)));
    }
    registry
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ledger entry for {0} has neither a before nor an after snapshot")]
    MissingSnapshot(&'static str),

    #[error("{0} snapshot has no restorable columns")]
    NoRestorableColumns(&'static str),
}

impl From<RestoreError> for CoreError {
    fn from(err: RestoreError) -> Self {
        match err {
            RestoreError::Database(e) => CoreError::store("restore snapshot", e),
            other => CoreError::Validation(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// SnapshotRestorer
// ---------------------------------------------------------------------------

/// [`EntityRestorer`] for any table described by a [`SnapshotTable`].
///
/// Each restore runs in its own transaction with the row locked
/// `FOR UPDATE`, so the drift check and the write see the same state. The
/// `undo` entry is inserted before commit; if that insert fails the entity
/// write rolls back with it.
pub struct SnapshotRestorer {
    pool: PgPool,
    table: SnapshotTable,
}

impl SnapshotRestorer {
    pub fn new(pool: PgPool, table: SnapshotTable) -> Self {
        Self { pool, table }
    }

    async fn apply(
        &self,
        entity_id: DbId,
        before: Option<&Value>,
        after: Option<&Value>,
        undo: &NewActivity,
    ) -> Result<RestoreOutcome, RestoreError> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock_current(&mut *tx, entity_id).await?;

        let outcome = match (before, after) {
            (Some(before), Some(after)) => {
                self.revert_update(&mut *tx, entity_id, current, before, after)
                    .await?
            }
            (None, Some(after)) => self.revert_create(&mut *tx, entity_id, current, after).await?,
            (Some(before), None) => self.revert_delete(&mut *tx, entity_id, current, before).await?,
            (None, None) => return Err(RestoreError::MissingSnapshot(self.table.entity_type)),
        };

        if outcome == RestoreOutcome::Restored {
            let entry = ActivityRepo::create(&mut *tx, &CreateActivityLog::from(undo)).await?;
            tx.commit().await?;
            tracing::debug!(
                entity_type = self.table.entity_type,
                entity_id,
                undo_id = entry.id,
                "Undo entry recorded"
            );
        } else {
            tx.rollback().await?;
        }
        Ok(outcome)
    }

    /// Current row as JSON, locked for the rest of the transaction.
    async fn lock_current(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
    ) -> Result<Option<Value>, sqlx::Error> {
        let query = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE t.id = $1 FOR UPDATE",
            self.table.table
        );
        sqlx::query_scalar::<_, Value>(&query)
            .bind(entity_id)
            .fetch_optional(conn)
            .await
    }

    /// A trashed row only counts as present when the action being reversed
    /// is the one that trashed it.
    fn visible(&self, current: Option<Value>, after: &Value) -> Option<Value> {
        current.filter(|row| {
            !self.table.is_trashed(row) || after.get("is_trashed") == Some(&Value::Bool(true))
        })
    }

    fn drift(&self, after: &Value, current: &Value) -> Option<RestoreOutcome> {
        let fields = drifted_fields(after, current, Some(self.table.columns));
        (!fields.is_empty()).then_some(RestoreOutcome::Conflict { fields })
    }

    async fn revert_update(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
        current: Option<Value>,
        before: &Value,
        after: &Value,
    ) -> Result<RestoreOutcome, RestoreError> {
        let Some(current) = self.visible(current, after) else {
            return Ok(RestoreOutcome::NotFound);
        };
        if let Some(conflict) = self.drift(after, &current) {
            return Ok(conflict);
        }
        self.write_columns(conn, entity_id, before).await?;
        Ok(RestoreOutcome::Restored)
    }

    async fn revert_create(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
        current: Option<Value>,
        after: &Value,
    ) -> Result<RestoreOutcome, RestoreError> {
        let Some(current) = self.visible(current, after) else {
            return Ok(RestoreOutcome::NotFound);
        };
        if let Some(conflict) = self.drift(after, &current) {
            return Ok(conflict);
        }

        let query = if self.table.soft_delete {
            format!(
                "UPDATE {} SET is_trashed = true, trashed_at = NOW() WHERE id = $1",
                self.table.table
            )
        } else {
            format!("DELETE FROM {} WHERE id = $1", self.table.table)
        };
        sqlx::query(&query).bind(entity_id).execute(conn).await?;
        Ok(RestoreOutcome::Restored)
    }

    async fn revert_delete(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
        current: Option<Value>,
        before: &Value,
    ) -> Result<RestoreOutcome, RestoreError> {
        match current {
            Some(row) if self.table.is_trashed(&row) => {
                let mut untrashed = before.clone();
                if let Some(fields) = untrashed.as_object_mut() {
                    fields.insert("is_trashed".into(), json!(false));
                    fields.insert("trashed_at".into(), Value::Null);
                }
                self.write_columns(conn, entity_id, &untrashed).await?;
                Ok(RestoreOutcome::Restored)
            }
            Some(_) => Ok(RestoreOutcome::Conflict {
                fields: vec!["<exists>".into()],
            }),
            None => {
                self.insert_row(conn, entity_id, before).await?;
                Ok(RestoreOutcome::Restored)
            }
        }
    }

    async fn write_columns(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
        state: &Value,
    ) -> Result<(), RestoreError> {
        let cols = self.table.restorable(state);
        if cols.is_empty() {
            return Err(RestoreError::NoRestorableColumns(self.table.entity_type));
        }

        let mut assignments: Vec<String> = cols.iter().map(|c| format!("{c} = r.{c}")).collect();
        if let Some(touch) = self.table.touch_column {
            assignments.push(format!("{touch} = NOW()"));
        }
        let table = self.table.table;
        let query = format!(
            "UPDATE {table} AS t SET {}
             FROM jsonb_populate_record(NULL::{table}, $2) AS r
             WHERE t.id = $1",
            assignments.join(", ")
        );
        sqlx::query(&query)
            .bind(entity_id)
            .bind(state)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Re-create a deleted row under its original id. Columns absent from
    /// the snapshot take their defaults.
    async fn insert_row(
        &self,
        conn: &mut PgConnection,
        entity_id: DbId,
        state: &Value,
    ) -> Result<(), RestoreError> {
        let cols = self.table.restorable(state);
        if cols.is_empty() {
            return Err(RestoreError::NoRestorableColumns(self.table.entity_type));
        }

        let table = self.table.table;
        let targets = cols.join(", ");
        let sources: Vec<String> = cols.iter().map(|c| format!("r.{c}")).collect();
        let query = format!(
            "INSERT INTO {table} (id, {targets})
             SELECT $1, {} FROM jsonb_populate_record(NULL::{table}, $2) AS r",
            sources.join(", ")
        );
        sqlx::query(&query)
            .bind(entity_id)
            .bind(state)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EntityRestorer for SnapshotRestorer {
    fn entity_type(&self) -> &str {
        self.table.entity_type
    }

    async fn restore(
        &self,
        entity_id: DbId,
        request: RestoreRequest<'_>,
    ) -> Result<RestoreOutcome, CoreError> {
        let before = request.before.filter(|v| !v.is_null());
        let after = request.after.filter(|v| !v.is_null());

        let outcome = self.apply(entity_id, before, after, request.undo).await?;
        tracing::debug!(
            entity_type = self.table.entity_type,
            entity_id,
            ?outcome,
            "Snapshot restore finished"
        );
        Ok(outcome)
    }
}
