//! Page model and DTOs.

use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Page {
    pub id: DbId,
    pub drive_id: DbId,
    pub title: String,
    pub content: String,
    pub is_trashed: bool,
    pub trashed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a page.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePage {
    pub drive_id: DbId,
    pub title: String,
    /// Defaults to empty.
    pub content: Option<String>,
}

/// DTO for editing a page. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePage {
    pub title: Option<String>,
    pub content: Option<String>,
}
