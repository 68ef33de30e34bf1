//! Per-user page permission model.

use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `page_permissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PagePermission {
    pub id: DbId,
    pub page_id: DbId,
    pub user_id: DbId,
    pub can_view: bool,
    pub can_edit: bool,
    pub can_share: bool,
    pub created_at: Timestamp,
}

/// DTO for granting a permission. Omitted flags take the column defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePagePermission {
    pub page_id: DbId,
    pub user_id: DbId,
    pub can_view: Option<bool>,
    pub can_edit: Option<bool>,
    pub can_share: Option<bool>,
}
