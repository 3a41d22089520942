//! Run phase tracking.

use crate::error::{Error, Result};

/// Lifecycle of a single run.
///
/// `MapComplete -> ReduceScheduled` is only taken after the map stage has
/// returned, i.e. after every batch has finished. Any phase may jump straight
/// to `Finalized` when the run is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    MapScheduled,
    MapComplete,
    ReduceScheduled,
    ReduceComplete,
    Finalized,
}

impl RunPhase {
    pub fn can_advance_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Finalized, _) => false,
            (_, Finalized) => true,
            (Idle, MapScheduled)
            | (MapScheduled, MapComplete)
            | (MapComplete, ReduceScheduled)
            | (ReduceScheduled, ReduceComplete) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct RunState {
    phase: RunPhase,
}

impl RunState {
    pub(crate) fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
        }
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.phase
    }

    pub(crate) fn advance(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(Error::InvariantViolation(format!(
                "Illegal run phase transition {:?} -> {:?}",
                self.phase, next
            )));
        }
        tracing::trace!(from = ?self.phase, to = ?next, "Run phase transition");
        self.phase = next;
        Ok(())
    }
}

impl Drop for RunState {
    fn drop(&mut self) {
        if self.phase != RunPhase::Finalized {
            tracing::debug!(phase = ?self.phase, "Run abandoned before finalization");
        }
    }
}
