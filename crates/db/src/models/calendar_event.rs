//! Calendar event model and DTOs.

use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `calendar_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CalendarEvent {
    pub id: DbId,
    pub drive_id: DbId,
    pub page_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCalendarEvent {
    pub drive_id: DbId,
    pub page_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}
