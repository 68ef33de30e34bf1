//! Repository for the `drives` and `drive_members` tables.

use pagespace_core::types::DbId;
use sqlx::PgPool;

use crate::models::drive::{CreateDrive, CreateDriveMember, Drive, DriveMember};

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

const COLUMNS: &str = "id, name, owner_id, created_at";

const MEMBER_COLUMNS: &str = "id, drive_id, user_id, role, created_at";

// ---------------------------------------------------------------------------
// DriveRepo
// ---------------------------------------------------------------------------

/// Provides drive, membership, and edit-access queries.
pub struct DriveRepo;

impl DriveRepo {
    pub async fn create(pool: &PgPool, input: &CreateDrive) -> Result<Drive, sqlx::Error> {
        let query = format!(
            "INSERT INTO drives (name, owner_id) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Drive>(&query)
            .bind(&input.name)
            .bind(input.owner_id)
            .fetch_one(pool)
            .await
    }

    /// Add a member to a drive, returning the created row.
    ///
    /// If `role` is `None` in the input, defaults to `member`.
    pub async fn add_member(
        pool: &PgPool,
        input: &CreateDriveMember,
    ) -> Result<DriveMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO drive_members (drive_id, user_id, role)
             VALUES ($1, $2, COALESCE($3, 'member'))
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, DriveMember>(&query)
            .bind(input.drive_id)
            .bind(input.user_id)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_member_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DriveMember>, sqlx::Error> {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM drive_members WHERE id = $1");
        sqlx::query_as::<_, DriveMember>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Remove a membership row. Returns `true` if a row was removed.
    pub async fn remove_member(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM drive_members WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether `user_id` may edit `page_id`.
    ///
    /// Granted to the drive owner, to drive members with role `owner` or
    /// `admin`, and to users holding a `page_permissions` row with
    /// `can_edit`. Unknown pages yield `false`.
    pub async fn can_user_edit_page(
        pool: &PgPool,
        user_id: DbId,
        page_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM pages p
                 JOIN drives d ON d.id = p.drive_id
                 WHERE p.id = $2
                   AND (
                       d.owner_id = $1
                       OR EXISTS (
                           SELECT 1 FROM drive_members m
                           WHERE m.drive_id = d.id AND m.user_id = $1
                             AND m.role IN ('owner', 'admin')
                       )
                       OR EXISTS (
                           SELECT 1 FROM page_permissions pp
                           WHERE pp.page_id = p.id AND pp.user_id = $1 AND pp.can_edit
                       )
                   )
             )",
        )
        .bind(user_id)
        .bind(page_id)
        .fetch_one(pool)
        .await
    }
}
