//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.
//! Publishers never block and never fail: an event published with no
//! subscribers is dropped.

use chrono::{DateTime, Utc};
use pagespace_core::ai_undo::{UndoCheckpoint, UndoMode, UndoResult};
use pagespace_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Known event names.
pub mod event_types {
    /// An AI undo finished with at least partial success.
    pub const AI_UNDO_EXECUTED: &str = "ai_undo.executed";
}

// ---------------------------------------------------------------------------
// WorkspaceEvent
// ---------------------------------------------------------------------------

/// Something that changed in a drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceEvent {
    /// Dot-separated event name, e.g. `"ai_undo.executed"`.
    pub event_type: String,
    pub page_id: Option<DbId>,
    pub drive_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    /// Event-specific data.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl WorkspaceEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            page_id: None,
            drive_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Scope the event to a page and the drive it lives in.
    pub fn on_page(mut self, page_id: DbId, drive_id: DbId) -> Self {
        self.page_id = Some(page_id);
        self.drive_id = Some(drive_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// `ai_undo.executed` for a finished execute.
    pub fn ai_undo_executed(
        checkpoint: &UndoCheckpoint,
        mode: UndoMode,
        result: &UndoResult,
        actor: DbId,
    ) -> Self {
        Self::new(event_types::AI_UNDO_EXECUTED)
            .on_page(checkpoint.page_id, checkpoint.drive_id)
            .with_actor(actor)
            .with_payload(serde_json::json!({
                "messageId": checkpoint.origin_message_id,
                "conversationId": checkpoint.conversation_id,
                "mode": mode.as_str(),
                "messagesDeleted": result.messages_deleted,
                "activitiesRolledBack": result.activities_rolled_back,
                "errorCount": result.errors.len(),
            }))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use pagespace_events::bus::{EventBus, WorkspaceEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(WorkspaceEvent::new("page.updated"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<WorkspaceEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it.
    pub fn publish(&self, event: WorkspaceEvent) -> usize {
        // SendError only means there are zero receivers.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
