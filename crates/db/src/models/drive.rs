//! Drive and drive membership models.

use pagespace_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Allowed values for `drive_members.role`.
pub mod member_roles {
    pub const OWNER: &str = "owner";
    pub const ADMIN: &str = "admin";
    pub const MEMBER: &str = "member";
}

/// A row from the `drives` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Drive {
    pub id: DbId,
    pub name: String,
    pub owner_id: DbId,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrive {
    pub name: String,
    pub owner_id: DbId,
}

/// A row from the `drive_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DriveMember {
    pub id: DbId,
    pub drive_id: DbId,
    pub user_id: DbId,
    pub role: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDriveMember {
    pub drive_id: DbId,
    pub user_id: DbId,
    /// Defaults to `member`.
    pub role: Option<String>,
}
