//! Transaction index: lookups by transaction hash, by inbound message hash and by
//! destination account, plus traces of aborted transactions.
//!
//! # Invariants
//! - Every transaction hash maps to exactly one transaction; re-recording a known
//!   hash is rejected so per-account history never holds duplicates.
//! - Inbound message hash -> transaction hash is injective.
//! - Per-account history is newest first: records are prepended as they arrive.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::core::account::{Address, LogicalTime};
use crate::core::transaction::Transaction;
use crate::core::TxHash;
use crate::trace::TraceStep;

#[derive(Debug, Clone, Default)]
pub struct TransactionIndex {
    transactions: Arc<HashMap<TxHash, Transaction>>,
    /// inbound message hash -> transaction hash
    msg_to_tx: Arc<HashMap<String, TxHash>>,
    /// destination address -> transaction hashes, newest first
    account_history: Arc<HashMap<Address, VecDeque<TxHash>>>,
    traces: Arc<HashMap<TxHash, Vec<TraceStep>>>,
}

impl TransactionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transaction together with its trace, if one was captured.
    ///
    /// Returns `false` (and changes nothing) if the hash is already indexed.
    pub fn record(&mut self, tx: Transaction, trace: Option<Vec<TraceStep>>) -> bool {
        if self.transactions.contains_key(&tx.hash) {
            return false;
        }

        let hash = tx.hash.clone();
        Arc::make_mut(&mut self.msg_to_tx).insert(tx.in_message.hash.clone(), hash.clone());
        if let Some(address) = tx.account() {
            Arc::make_mut(&mut self.account_history)
                .entry(address.clone())
                .or_default()
                .push_front(hash.clone());
        }
        if let Some(trace) = trace {
            Arc::make_mut(&mut self.traces).insert(hash.clone(), trace);
        }
        Arc::make_mut(&mut self.transactions).insert(hash, tx);
        true
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.transactions.contains_key(hash)
    }

    pub fn by_hash(&self, hash: &str) -> Option<&Transaction> {
        self.transactions.get(hash)
    }

    /// Transaction that consumed the message with hash `msg_hash`.
    pub fn by_inbound_message(&self, msg_hash: &str) -> Option<&Transaction> {
        self.msg_to_tx
            .get(msg_hash)
            .and_then(|tx_hash| self.by_hash(tx_hash))
    }

    /// Up to `limit` transactions on `address` with `lt <= upper_lt`, newest first.
    ///
    /// Walks the history lazily and stops as soon as `limit` entries are collected.
    pub fn history(&self, address: &str, upper_lt: LogicalTime, limit: usize) -> Vec<&Transaction> {
        self.account_history
            .get(address)
            .into_iter()
            .flatten()
            .filter_map(|hash| self.transactions.get(hash))
            .filter(|tx| tx.lt <= upper_lt)
            .take(limit)
            .collect()
    }

    pub fn trace(&self, hash: &str) -> Option<&[TraceStep]> {
        self.traces.get(hash).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All transactions sorted by `(lt, hash)`.
    pub fn transactions(&self) -> Vec<&Transaction> {
        let mut txs: Vec<&Transaction> = self.transactions.values().collect();
        txs.sort_by(|a, b| (a.lt, a.hash.as_str()).cmp(&(b.lt, b.hash.as_str())));
        txs
    }
}
