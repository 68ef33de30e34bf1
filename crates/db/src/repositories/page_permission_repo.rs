//! Repository for the `page_permissions` table.

use pagespace_core::types::DbId;
use sqlx::PgPool;

use crate::models::page_permission::{CreatePagePermission, PagePermission};

const COLUMNS: &str = "id, page_id, user_id, can_view, can_edit, can_share, created_at";

/// Provides grant, lookup, and revoke for page permissions.
pub struct PagePermissionRepo;

impl PagePermissionRepo {
    /// Grant a permission, returning the created row.
    pub async fn grant(
        pool: &PgPool,
        input: &CreatePagePermission,
    ) -> Result<PagePermission, sqlx::Error> {
        let query = format!(
            "INSERT INTO page_permissions (page_id, user_id, can_view, can_edit, can_share)
             VALUES ($1, $2, COALESCE($3, true), COALESCE($4, false), COALESCE($5, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PagePermission>(&query)
            .bind(input.page_id)
            .bind(input.user_id)
            .bind(input.can_view)
            .bind(input.can_edit)
            .bind(input.can_share)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<PagePermission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM page_permissions WHERE id = $1");
        sqlx::query_as::<_, PagePermission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Set the edit flag. Returns `true` if a row was updated.
    pub async fn set_can_edit(pool: &PgPool, id: DbId, can_edit: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE page_permissions SET can_edit = $2 WHERE id = $1")
            .bind(id)
            .bind(can_edit)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a permission. Returns `true` if a row was removed.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM page_permissions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
