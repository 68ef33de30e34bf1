//! Per-entity-type restorers and the registry that dispatches to them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::DbId;

use super::store::NewActivity;

/// The snapshots recorded by the ledger entry being reversed, and the
/// `undo` entry that records the reversal.
#[derive(Debug, Clone, Copy)]
pub struct RestoreRequest<'a> {
    /// State to put back. `None` means the action created the entity.
    pub before: Option<&'a Value>,
    /// State the action left behind. `None` means it deleted the entity.
    pub after: Option<&'a Value>,
    /// Appended to the ledger together with the entity write.
    pub undo: &'a NewActivity,
}

/// What happened when a restorer tried to apply a before-state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    /// The live entity no longer matches the recorded after-state.
    Conflict { fields: Vec<String> },
    NotFound,
}

/// Reapplies a prior snapshot to one live entity.
///
/// Implementations must re-read the current state, compare it with
/// `request.after`, and only write when they match, so that newer changes
/// made by someone else are never silently overwritten.
///
/// The entity write and the append of `request.undo` are one unit: either
/// both persist and the result is [`RestoreOutcome::Restored`], or neither
/// does. A failed append is returned as `Err` with the entity untouched.
#[async_trait]
pub trait EntityRestorer: Send + Sync {
    /// Ledger `entity_type` this restorer handles.
    fn entity_type(&self) -> &str;

    async fn restore(
        &self,
        entity_id: DbId,
        request: RestoreRequest<'_>,
    ) -> Result<RestoreOutcome, CoreError>;
}

/// Restorers keyed by entity type.
#[derive(Clone, Default)]
pub struct RestorerRegistry {
    restorers: HashMap<String, Arc<dyn EntityRestorer>>,
}

impl RestorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a restorer, replacing any previous one for the same type.
    pub fn register(&mut self, restorer: Arc<dyn EntityRestorer>) -> &mut Self {
        self.restorers
            .insert(restorer.entity_type().to_string(), restorer);
        self
    }

    pub fn with(mut self, restorer: Arc<dyn EntityRestorer>) -> Self {
        self.register(restorer);
        self
    }

    pub fn get(&self, entity_type: &str) -> Option<&Arc<dyn EntityRestorer>> {
        self.restorers.get(entity_type)
    }

    /// Registered entity types, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.restorers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for RestorerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorerRegistry")
            .field("entity_types", &self.entity_types())
            .finish()
    }
}
