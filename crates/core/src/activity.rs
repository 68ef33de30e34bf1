//! Activity ledger vocabulary and state-drift detection.
//!
//! The ledger (`activity_logs`) is append-only: every state-changing action,
//! human or AI, is written once with before/after snapshots and never
//! edited. Reversals are recorded as new `undo` entries that reference the
//! entry they reverse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Action type constants
// ---------------------------------------------------------------------------

/// Known action types for ledger entries.
pub mod action_types {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const PERMISSION_GRANT: &str = "permission_grant";
    pub const PERMISSION_REVOKE: &str = "permission_revoke";
    pub const MEMBER_ADD: &str = "member_add";
    pub const MEMBER_REMOVE: &str = "member_remove";
    /// Written by the undo engine; references the reversed entry.
    pub const UNDO: &str = "undo";
}

// ---------------------------------------------------------------------------
// Entity type constants
// ---------------------------------------------------------------------------

/// Entity types that have a registered restorer out of the box.
pub mod entity_types {
    pub const PAGE: &str = "page";
    pub const PAGE_PERMISSION: &str = "page_permission";
    pub const DRIVE_MEMBER: &str = "drive_member";
    pub const CALENDAR_EVENT: &str = "calendar_event";
}

// ---------------------------------------------------------------------------
// Tagged ledger variant
// ---------------------------------------------------------------------------

/// Whether a ledger entry records an original action or the reversal of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityKind {
    Original,
    Undo { undoes: DbId },
}

impl ActivityKind {
    /// Derive the kind from the nullable `undoes_activity_id` column.
    pub fn from_undoes(undoes_activity_id: Option<DbId>) -> Self {
        match undoes_activity_id {
            Some(undoes) => Self::Undo { undoes },
            None => Self::Original,
        }
    }

    pub fn undoes(&self) -> Option<DbId> {
        match self {
            Self::Undo { undoes } => Some(*undoes),
            Self::Original => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot shape
// ---------------------------------------------------------------------------

/// What a reversal has to do, derived from which snapshots were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotShape {
    /// Both snapshots present: write the before-state back.
    Update,
    /// No before-state: the action created the entity, so remove it.
    Created,
    /// No after-state: the action deleted the entity, so bring it back.
    Deleted,
    /// Neither snapshot present: nothing to restore from.
    Missing,
}

impl SnapshotShape {
    pub fn of(before: Option<&Value>, after: Option<&Value>) -> Self {
        let present = |v: Option<&Value>| v.is_some_and(|v| !v.is_null());
        match (present(before), present(after)) {
            (true, true) => Self::Update,
            (false, true) => Self::Created,
            (true, false) => Self::Deleted,
            (false, false) => Self::Missing,
        }
    }
}

// ---------------------------------------------------------------------------
// Drift detection
// ---------------------------------------------------------------------------

/// Return the fields whose live value no longer matches the recorded
/// after-state.
///
/// Only keys present in `recorded_after` are compared, and when `tracked` is
/// given only keys in that list. A key missing from `current` counts as
/// drifted. A non-object `recorded_after` compares the whole value.
pub fn drifted_fields(recorded_after: &Value, current: &Value, tracked: Option<&[&str]>) -> Vec<String> {
    let Some(expected) = recorded_after.as_object() else {
        return if recorded_after == current {
            Vec::new()
        } else {
            vec!["<value>".to_string()]
        };
    };

    expected
        .iter()
        .filter(|(key, _)| tracked.is_none_or(|cols| cols.contains(&key.as_str())))
        .filter(|(key, value)| !current.get(key.as_str()).is_some_and(|live| values_match(value, live)))
        .map(|(key, _)| key.clone())
        .collect()
}

/// JSON equality, except that two RFC 3339 strings naming the same instant
/// match regardless of offset or precision formatting, and integral numbers
/// match across integer and float encodings.
pub fn values_match(recorded: &Value, live: &Value) -> bool {
    if recorded == live {
        return true;
    }
    match (recorded, live) {
        (Value::String(a), Value::String(b)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(a),
                chrono::DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            }
        }
        (Value::Number(a), Value::Number(b)) => numbers_match(a, b),
        _ => false,
    }
}

/// Integers compare exactly; f64 is only used when either side is a float,
/// so distinct BIGINT ids never collapse to the same value.
fn numbers_match(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_u64().is_some() && a.as_u64() == b.as_u64(),
    }
}

/// Build the description for an `undo` ledger entry.
pub fn undo_description(original_description: Option<&str>, original_action: &str) -> String {
    match original_description {
        Some(desc) if !desc.trim().is_empty() => format!("Undo: {desc}"),
        _ => format!("Undo: {original_action}"),
    }
}
