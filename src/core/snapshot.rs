//! Snapshot table: numbered, immutable copies of the simulation state.
//!
//! Identifiers come from a monotonic counter (post-increment: the current value is
//! handed out, then the counter advances). Clearing the table or resetting the
//! executor never rewinds the counter, so an identifier is never reused.

use std::collections::HashMap;

use crate::core::state::{SimulationState, SnapshotableState, StateSnapshot};
use crate::error::{LocalnetError, Result};

pub type SnapshotId = u64;

#[derive(Debug, Default)]
pub struct SnapshotManager {
    snapshots: HashMap<SnapshotId, StateSnapshot>,
    next_id: SnapshotId,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a snapshot of `live` and returns its identifier.
    pub fn save(&mut self, live: &SimulationState) -> SnapshotId {
        let id = self.next_id;
        self.snapshots.insert(id, live.snapshot());
        self.next_id += 1;
        id
    }

    /// Returns a fresh live state built from snapshot `id`.
    pub fn restore(&self, id: SnapshotId) -> Result<SimulationState> {
        let snapshot = self
            .snapshots
            .get(&id)
            .ok_or(LocalnetError::SnapshotNotFound(id))?;
        let mut state = SimulationState::new();
        state.restore(snapshot);
        Ok(state)
    }

    pub fn get(&self, id: SnapshotId) -> Option<&StateSnapshot> {
        self.snapshots.get(&id)
    }

    /// Drops every stored snapshot. The identifier counter is left untouched.
    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Identifier the next `save` will return.
    pub fn next_id(&self) -> SnapshotId {
        self.next_id
    }
}
