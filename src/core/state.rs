//! Simulation state: ledger, transaction index and message queue, mutated together.
//!
//! # Snapshots
//! A [`StateSnapshot`] is an immutable copy of a [`SimulationState`]. Every component
//! keeps its data behind an `Arc` and writes through `Arc::make_mut`, so taking a
//! snapshot is O(1) and the live state pays for a copy only on its first write.
//!
//! # Invariants
//! - **Immutability:** a snapshot has no mutation methods; its contents never change.
//! - **Isolation:** mutating the live state after a snapshot (or after a restore)
//!   never affects any snapshot, and restoring the same snapshot twice yields two
//!   independent live states.
//! - **Restore identity:** `state.restore(&state.snapshot())` leaves the state unchanged.

use sha2::{Digest, Sha256};

use crate::core::index::TransactionIndex;
use crate::core::ledger::Ledger;
use crate::core::queue::MessageQueue;

/// Types that can produce immutable snapshots of themselves.
pub trait SnapshotableState {
    fn snapshot(&self) -> StateSnapshot;
}

/// Live simulation state owned by the executor.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    pub ledger: Ledger,
    pub index: TransactionIndex,
    pub queue: MessageQueue,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces this state with the contents of `snapshot`.
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        *self = snapshot.state.clone();
    }

    /// Deterministic digest over accounts, transactions and pending messages.
    ///
    /// Every collection is iterated in sorted order, so equal states always hash equal.
    pub fn compute_state_root(&self) -> String {
        let mut hasher = Sha256::new();
        for account in self.ledger.accounts() {
            hasher.update(account.address.as_bytes());
            hasher.update(&account.boc);
            hasher.update(account.balance.to_le_bytes());
        }
        for tx in self.index.transactions() {
            hasher.update(tx.hash.as_bytes());
            hasher.update(tx.lt.to_le_bytes());
        }
        for msg in self.queue.pending() {
            hasher.update(msg.hash.as_bytes());
            hasher.update(msg.ordering_lt().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl SnapshotableState for SimulationState {
    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.clone(),
        }
    }
}

/// Immutable snapshot of the full simulation state.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    state: SimulationState,
}

impl StateSnapshot {
    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    pub fn index(&self) -> &TransactionIndex {
        &self.state.index
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.state.queue
    }

    pub fn compute_state_root(&self) -> String {
        self.state.compute_state_root()
    }
}

impl PartialEq for StateSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.compute_state_root() == other.compute_state_root()
    }
}

impl Eq for StateSnapshot {}
