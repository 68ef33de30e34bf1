//! Repository for the `calendar_events` table.

use pagespace_core::types::DbId;
use sqlx::PgPool;

use crate::models::calendar_event::{CalendarEvent, CreateCalendarEvent};

const COLUMNS: &str = "id, drive_id, page_id, title, description, starts_at, ends_at, created_at";

/// Provides CRUD operations for calendar events.
pub struct CalendarEventRepo;

impl CalendarEventRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateCalendarEvent,
    ) -> Result<CalendarEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO calendar_events (drive_id, page_id, title, description, starts_at, ends_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CalendarEvent>(&query)
            .bind(input.drive_id)
            .bind(input.page_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CalendarEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM calendar_events WHERE id = $1");
        sqlx::query_as::<_, CalendarEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Rename an event. Returns `true` if a row was updated.
    pub async fn rename(pool: &PgPool, id: DbId, title: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE calendar_events SET title = $2 WHERE id = $1")
            .bind(id)
            .bind(title)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete an event. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
