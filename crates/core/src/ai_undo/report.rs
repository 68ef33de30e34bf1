//! Result aggregation: per-unit outcomes -> one flat [`UndoResult`].

use super::types::{UndoError, UndoResult};

/// How a boundary layer should classify an execute result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// No errors.
    Success,
    /// Some units failed but something was deleted or rolled back.
    PartialSuccess,
    /// Errors and zero progress.
    Failure,
}

impl UndoResult {
    pub fn outcome(&self) -> UndoOutcome {
        if self.errors.is_empty() {
            UndoOutcome::Success
        } else if self.messages_deleted > 0 || self.activities_rolled_back > 0 {
            UndoOutcome::PartialSuccess
        } else {
            UndoOutcome::Failure
        }
    }
}

/// Outcome of reversing one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    /// Position of the entry in the newest-first scope.
    pub index: usize,
    /// The entity's state was changed back.
    pub rolled_back: bool,
    pub error: Option<UndoError>,
}

/// Collects unit outcomes; the summary is computed only in [`finish`].
///
/// [`finish`]: ResultAggregator::finish
#[derive(Debug, Default)]
pub struct ResultAggregator {
    messages_deleted: i64,
    units: Vec<UnitOutcome>,
}

impl ResultAggregator {
    pub fn new(messages_deleted: i64) -> Self {
        Self {
            messages_deleted,
            units: Vec::new(),
        }
    }

    pub fn record(&mut self, unit: UnitOutcome) {
        self.units.push(unit);
    }

    pub fn extend(&mut self, units: impl IntoIterator<Item = UnitOutcome>) {
        self.units.extend(units);
    }

    /// Errors are reported in scope order, independent of completion order.
    pub fn finish(mut self) -> UndoResult {
        self.units.sort_by_key(|u| u.index);

        let activities_rolled_back = self.units.iter().filter(|u| u.rolled_back).count() as i64;
        let errors: Vec<UndoError> = self.units.into_iter().filter_map(|u| u.error).collect();

        UndoResult {
            success: errors.is_empty(),
            messages_deleted: self.messages_deleted,
            activities_rolled_back,
            errors,
        }
    }
}
