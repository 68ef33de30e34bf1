use std::fmt::Display;

use crate::types::DbId;

/// Domain error shared by the engine, its collaborators, and the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Wrap a storage-layer failure, prefixing it with what was being done.
    pub fn store(context: &str, err: impl Display) -> Self {
        Self::Internal(format!("{context}: {err}"))
    }
}
