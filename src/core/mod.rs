// Core module: the simulation engine.
//
// DETERMINISM GUARANTEES:
// =======================
// 1. Messages are executed in (logical time, submission order)
// 2. Simulated time comes only from the injected clock
// 3. Every step mutates ledger, index and queue together under one write lock
// 4. Snapshots share structure with the live state but are never mutated after capture
//
// INVARIANTS:
// - The queue never holds a message without a destination
// - A transaction is recorded at most once per hash
// - Snapshot ids are never reused, not even after reset

pub mod account;
pub mod fetcher;
pub mod genesis;
pub mod index;
pub mod ledger;
pub mod message;
pub mod oracle;
pub mod queue;
pub mod snapshot;
pub mod state;
pub mod transaction;

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::clock::Clock;
use crate::config::{ChainConfig, EngineConfig};
use crate::core::account::{AccountState, Address, LogicalTime};
use crate::core::fetcher::AccountFetcher;
use crate::core::message::Message;
use crate::core::oracle::{AccountUpdate, BocKind, ExecutionOracle, ExecutionRequest, OracleAdapter, OracleOutcome};
use crate::core::snapshot::{SnapshotId, SnapshotManager};
use crate::core::state::SimulationState;
use crate::core::transaction::Transaction;
use crate::error::{LocalnetError, Result};
use crate::trace::TraceStep;

/// Transaction hash type (alias for String)
pub type TxHash = String;

/// Result of a single [`Executor::process_one`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The queue was empty.
    Idle,
    /// The message produced a transaction.
    Executed { tx_hash: TxHash, aborted: bool },
    /// The oracle failed or the transaction was already indexed; the message was discarded.
    Dropped { msg_hash: String, reason: String },
}

#[derive(Debug, Default)]
struct EngineState {
    live: SimulationState,
    snapshots: SnapshotManager,
}

/// Simulation loop and query façade over one in-memory ledger.
///
/// All mutating operations (enqueue, processing, snapshot save/restore, reset)
/// take the same write lock, so ledger, index and queue are never observed
/// half-updated. Queries take the read lock; only an account lookup that misses
/// and succeeds through the fetcher writes the fetched state back.
pub struct Executor {
    config: EngineConfig,
    adapter: OracleAdapter,
    fetcher: Option<Arc<dyn AccountFetcher>>,
    clock: OnceLock<Arc<dyn Clock>>,
    state: RwLock<EngineState>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("clock", &self.clock.get())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an executor seeded with the bootstrap accounts. No clock is set yet.
    pub fn new(config: EngineConfig, oracle: Arc<dyn ExecutionOracle>) -> Result<Self> {
        config.validate()?;
        let adapter = OracleAdapter::new(oracle);
        let live = genesis::bootstrap_state(&config.genesis, &adapter)?;
        info!(
            "Executor initialized: global_id={}, giver={}",
            config.chain.global_id, config.genesis.giver_address
        );

        Ok(Self {
            config,
            adapter,
            fetcher: None,
            clock: OnceLock::new(),
            state: RwLock::new(EngineState {
                live,
                snapshots: SnapshotManager::new(),
            }),
        })
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn AccountFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Result<Self> {
        self.set_clock(clock)?;
        Ok(self)
    }

    /// Assigns the simulated clock. Fails with `ClockAlreadySet` on a second call.
    pub fn set_clock(&self, clock: Arc<dyn Clock>) -> Result<()> {
        self.clock.set(clock).map_err(|_| LocalnetError::ClockAlreadySet)
    }

    pub fn has_clock(&self) -> bool {
        self.clock.get().is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.config.chain
    }

    pub fn adapter(&self) -> &OracleAdapter {
        &self.adapter
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_secs(&self) -> Result<u32> {
        self.clock
            .get()
            .map(|clock| clock.now_secs())
            .ok_or(LocalnetError::ClockNotSet)
    }

    fn fetch_remote(&self, address: &str) -> Option<AccountState> {
        let fetcher = self.fetcher.as_deref()?;
        fetcher::fetch_account(fetcher, &self.adapter, address)
    }

    // ----- accounts -----

    /// Decodes `boc` and stores it as the state of `address`, replacing any previous state.
    /// A blob describing no account removes the address.
    pub fn set_account(&self, address: &str, boc: &[u8], kind: BocKind) -> Result<()> {
        let decoded = self.adapter.decode_account(address, boc, kind)?;
        let mut guard = self.write();
        match decoded {
            Some(state) => {
                debug!("Account {} set directly", address);
                guard.live.ledger.set(address.to_string(), state);
            }
            None => {
                debug!("Account {} removed directly", address);
                guard.live.ledger.remove(address);
            }
        }
        Ok(())
    }

    /// Account state, falling back to the fetcher on a ledger miss.
    ///
    /// A fetched account is stored, so later lookups and listings see it without
    /// fetching again.
    pub fn get_account(&self, address: &str) -> Option<AccountState> {
        if let Some(state) = self.read().live.ledger.get(address).cloned() {
            return Some(state);
        }
        let fetched = self.fetch_remote(address)?;

        let mut guard = self.write();
        if let Some(existing) = guard.live.ledger.get(address) {
            return Some(existing.clone());
        }
        debug!("Account {} cached from fetcher", address);
        guard.live.ledger.set(address.to_string(), fetched.clone());
        Some(fetched)
    }

    /// All ledger accounts, sorted by address.
    pub fn get_accounts(&self) -> Vec<AccountState> {
        self.read().live.ledger.accounts().into_iter().cloned().collect()
    }

    pub fn find_accounts<P>(&self, predicate: P) -> Vec<AccountState>
    where
        P: Fn(&AccountState) -> bool,
    {
        self.read()
            .live
            .ledger
            .find(predicate)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Addresses whose code hash equals `code_hash`, sorted.
    pub fn accounts_by_code_hash(&self, code_hash: &str) -> Vec<Address> {
        self.find_accounts(|state| state.has_code_hash(code_hash))
            .into_iter()
            .map(|state| state.address)
            .collect()
    }

    // ----- transactions -----

    pub fn get_transaction(&self, tx_hash: &str) -> Option<Transaction> {
        self.read().live.index.by_hash(tx_hash).cloned()
    }

    /// Transaction that consumed the message with hash `msg_hash`.
    pub fn get_dst_transaction(&self, msg_hash: &str) -> Option<Transaction> {
        self.read().live.index.by_inbound_message(msg_hash).cloned()
    }

    /// Up to `count` transactions on `address` with `lt <= from_lt`, newest first.
    pub fn get_transactions(&self, address: &str, from_lt: LogicalTime, count: usize) -> Vec<Transaction> {
        self.read()
            .live
            .index
            .history(address, from_lt, count)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Trace captured for an aborted transaction.
    pub fn get_tx_trace(&self, tx_hash: &str) -> Option<Vec<TraceStep>> {
        self.read().live.index.trace(tx_hash).map(<[TraceStep]>::to_vec)
    }

    /// Every recorded transaction, sorted by `(lt, hash)`.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.read().live.index.transactions().into_iter().cloned().collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.read().live.index.len()
    }

    // ----- queue and simulation loop -----

    /// Queues a message. Messages without a destination are rejected.
    pub fn enqueue_message(&self, message: Message) -> Result<()> {
        let mut guard = self.write();
        guard.live.queue.enqueue(message)
    }

    pub fn queue_len(&self) -> usize {
        self.read().live.queue.len()
    }

    /// Pending messages in processing order.
    pub fn pending_messages(&self) -> Vec<Message> {
        self.read().live.queue.pending()
    }

    /// Executes the lowest-ordered queued message, if any.
    ///
    /// Fails only with `ClockNotSet`; in that case the message stays queued.
    pub fn process_one(&self) -> Result<StepOutcome> {
        let mut guard = self.write();
        self.step(&mut guard.live)
    }

    /// Processes messages until the queue is empty. Returns the number of steps taken.
    ///
    /// The lock is released between steps, so queries observe every intermediate state.
    pub fn drain(&self) -> Result<usize> {
        let mut steps = 0;
        while self.process_one()? != StepOutcome::Idle {
            steps += 1;
        }
        if steps > 0 {
            debug!("Drained {} message(s)", steps);
        }
        Ok(steps)
    }

    fn step(&self, live: &mut SimulationState) -> Result<StepOutcome> {
        if live.queue.is_empty() {
            return Ok(StepOutcome::Idle);
        }
        let utime = self.now_secs()?;
        let Some(message) = live.queue.pop_lowest() else {
            return Ok(StepOutcome::Idle);
        };
        let Some(address) = message.dst.clone() else {
            return Ok(self.drop_message(&message, "message has no destination".to_string()));
        };

        let receiver = match live.ledger.get(&address) {
            Some(state) => Some(state.clone()),
            None => {
                let fetched = self.fetch_remote(&address);
                if let Some(state) = &fetched {
                    live.ledger.set(address.clone(), state.clone());
                }
                fetched
            }
        };
        let request = ExecutionRequest {
            config: &self.config.chain,
            account: receiver.as_ref(),
            message: &message,
            utime,
            trace: false,
        };

        let output = match self.adapter.execute(&request).into_result() {
            Ok(output) => output,
            Err(reason) => return Ok(self.drop_message(&message, reason.to_string())),
        };
        if live.index.contains(&output.transaction.hash) {
            let reason = format!("transaction {} is already indexed", output.transaction.hash);
            return Ok(self.drop_message(&message, reason));
        }

        let trace = if output.transaction.aborted && self.config.trace_aborted {
            self.capture_trace(&request)
        } else {
            None
        };

        match output.account {
            AccountUpdate::Updated(state) => live.ledger.set(address.clone(), state),
            AccountUpdate::Destroyed => {
                if live.ledger.remove(&address).is_some() {
                    debug!("Account {} destroyed", address);
                }
            }
        }

        let tx = output.transaction;
        let tx_hash = tx.hash.clone();
        let tx_lt = tx.lt;
        let aborted = tx.aborted;
        let outbound: Vec<Message> = tx.internal_messages().cloned().collect();
        let events = tx.events().count();
        live.index.record(tx, trace);

        for out in outbound {
            live.queue.enqueue(out)?;
        }
        debug!(
            "Executed message {} on {}: tx={}, lt={}, aborted={}, events discarded={}",
            message.hash,
            address,
            tx_hash,
            tx_lt,
            aborted,
            events
        );

        Ok(StepOutcome::Executed { tx_hash, aborted })
    }

    /// Re-runs an aborted execution with tracing on. The result is never committed.
    fn capture_trace(&self, request: &ExecutionRequest<'_>) -> Option<Vec<TraceStep>> {
        let traced = ExecutionRequest {
            trace: true,
            ..*request
        };
        match self.adapter.execute(&traced) {
            OracleOutcome::Success(output) => Some(output.trace.unwrap_or_default()),
            OracleOutcome::Failure { reason } => {
                warn!("Trace re-run of message {} failed: {}", request.message.hash, reason);
                None
            }
        }
    }

    fn drop_message(&self, message: &Message, reason: String) -> StepOutcome {
        warn!("Dropping message {}: {}", message.hash, reason);
        StepOutcome::Dropped {
            msg_hash: message.hash.clone(),
            reason,
        }
    }

    // ----- snapshots -----

    /// Captures the live state and returns the snapshot id.
    pub fn save_snapshot(&self) -> SnapshotId {
        let mut guard = self.write();
        let EngineState { live, snapshots } = &mut *guard;
        let id = snapshots.save(live);
        info!("Saved snapshot {}", id);
        id
    }

    /// Replaces the live state with snapshot `id`.
    pub fn restore_snapshot(&self, id: SnapshotId) -> Result<()> {
        let mut guard = self.write();
        let restored = guard.snapshots.restore(id)?;
        guard.live = restored;
        info!("Restored snapshot {}", id);
        Ok(())
    }

    /// Drops every stored snapshot. Live state and the id counter are kept.
    pub fn clear_snapshots(&self) {
        let mut guard = self.write();
        let dropped = guard.snapshots.len();
        guard.snapshots.clear();
        info!("Cleared {} snapshot(s)", dropped);
    }

    pub fn snapshot_count(&self) -> usize {
        self.read().snapshots.len()
    }

    /// Re-seeds the live state with the bootstrap accounts. Snapshots are kept.
    pub fn reset_to_initial(&self) -> Result<()> {
        let live = genesis::bootstrap_state(&self.config.genesis, &self.adapter)?;
        self.write().live = live;
        info!("Live state reset to genesis");
        Ok(())
    }

    /// Deterministic digest of the live state.
    pub fn state_root(&self) -> String {
        self.read().live.compute_state_root()
    }
}
