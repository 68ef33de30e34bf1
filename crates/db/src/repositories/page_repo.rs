//! Repository for the `pages` table.

use pagespace_core::types::DbId;
use sqlx::PgPool;

use crate::models::page::{CreatePage, Page, UpdatePage};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, drive_id, title, content, is_trashed, trashed_at, created_at, updated_at";

/// Provides CRUD operations for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a new page, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePage) -> Result<Page, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (drive_id, title, content)
             VALUES ($1, $2, COALESCE($3, ''))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(input.drive_id)
            .bind(&input.title)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    /// Find a page by ID. Excludes trashed pages.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1 AND NOT is_trashed");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a page by ID, including trashed pages.
    pub async fn find_by_id_include_trashed(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The drive a page belongs to. Trashed pages still resolve.
    pub async fn drive_id_for(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT drive_id FROM pages WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update a page. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no live page with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePage,
    ) -> Result<Option<Page>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                updated_at = NOW()
             WHERE id = $1 AND NOT is_trashed
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Page>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.content)
            .fetch_optional(pool)
            .await
    }

    /// Move a page to the trash. Returns `true` if a row was trashed.
    pub async fn trash(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages SET is_trashed = true, trashed_at = NOW() WHERE id = $1 AND NOT is_trashed",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
