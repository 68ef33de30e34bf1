//! Checkpoint resolution: message id -> scoping anchor.

use crate::error::CoreError;
use crate::types::DbId;

use super::store::{MessageStore, PageDirectory};
use super::types::UndoCheckpoint;

/// Resolve the checkpoint anchored at `message_id`.
///
/// Performs no authorization; callers check edit rights on the returned
/// `page_id` before acting on it.
pub async fn resolve_checkpoint(
    messages: &dyn MessageStore,
    pages: &dyn PageDirectory,
    message_id: DbId,
) -> Result<UndoCheckpoint, CoreError> {
    let message = messages
        .find_message(message_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ChatMessage",
            id: message_id,
        })?;

    let drive_id = pages
        .drive_for_page(message.page_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Page",
            id: message.page_id,
        })?;

    Ok(UndoCheckpoint {
        origin_message_id: message.id,
        conversation_id: message.conversation_id,
        page_id: message.page_id,
        drive_id,
        cutoff: message.created_at,
    })
}
