//! Value types produced and consumed by the undo engine.
//!
//! Field names serialize in camelCase to match the preview/execute
//! transport contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How much of an AI turn to reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoMode {
    /// Soft-delete the chat messages only. The ledger is never read.
    MessagesOnly,
    /// Soft-delete the messages and reverse every AI ledger entry in scope.
    MessagesAndChanges,
}

/// Accepted mode strings, in the order they are reported in errors.
pub const VALID_MODES: &[&str] = &["messages_only", "messages_and_changes"];

impl UndoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessagesOnly => "messages_only",
            Self::MessagesAndChanges => "messages_and_changes",
        }
    }

    pub fn reverses_activities(&self) -> bool {
        matches!(self, Self::MessagesAndChanges)
    }
}

impl FromStr for UndoMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "messages_only" => Ok(Self::MessagesOnly),
            "messages_and_changes" => Ok(Self::MessagesAndChanges),
            other => Err(CoreError::Validation(format!(
                "Invalid undo mode '{other}'. Must be one of: {}",
                VALID_MODES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for UndoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Checkpoint
// ---------------------------------------------------------------------------

/// Anchor from which "everything after" is computed. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoCheckpoint {
    pub origin_message_id: DbId,
    pub conversation_id: DbId,
    pub page_id: DbId,
    pub drive_id: DbId,
    /// The checkpoint message's `created_at`; scope is `>=` this instant.
    pub cutoff: Timestamp,
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// Projection of a ledger entry shown to the user before executing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: DbId,
    pub action_type: String,
    pub entity_type: String,
    pub description: Option<String>,
}

/// Everything an execute at the same checkpoint would touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoPreview {
    pub messages_affected: i64,
    /// Newest first, the order reversal would run in.
    pub activities_affected: Vec<ActivitySummary>,
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Why a single ledger entry could not be reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoErrorReason {
    /// The entity changed after the AI action; reverting would clobber it.
    StateDrift,
    /// The entity no longer exists.
    NotFound,
    /// No restorer is registered for the entity type.
    RestorerNotFound,
    /// The entry carries neither a before- nor an after-state.
    MissingSnapshot,
    /// The restorer failed while writing the entity or its `undo` entry.
    /// Neither was persisted.
    RestoreFailed,
}

impl UndoErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDrift => "state_drift",
            Self::NotFound => "not_found",
            Self::RestorerNotFound => "restorer_not_found",
            Self::MissingSnapshot => "missing_snapshot",
            Self::RestoreFailed => "restore_failed",
        }
    }
}

/// One failed unit of work, reported instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoError {
    pub activity_id: DbId,
    pub entity_id: DbId,
    pub entity_type: String,
    pub reason: UndoErrorReason,
    pub detail: String,
}

/// Flat execute report. Counts are exact even when `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub success: bool,
    pub messages_deleted: i64,
    pub activities_rolled_back: i64,
    pub errors: Vec<UndoError>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Default number of entities reversed concurrently.
pub const DEFAULT_REVERSAL_CONCURRENCY: usize = 4;

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoConfig {
    /// Maximum number of distinct entities reversed at the same time.
    /// Reversals of the same entity always run one after another.
    pub reversal_concurrency: usize,
}

impl UndoConfig {
    pub fn new(reversal_concurrency: usize) -> Self {
        Self {
            reversal_concurrency: reversal_concurrency.max(1),
        }
    }
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REVERSAL_CONCURRENCY)
    }
}
