//! Account state as held by the ledger.
//!
//! The state blob is opaque to the engine; the derived metadata (balance, code hash,
//! last transaction) is filled in by the oracle's codec when the blob is decoded.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Chain address in its string form (e.g. `0:<64 hex>`).
pub type Address = String;

/// Logical time. Orders messages and transactions; unrelated to wall-clock time.
pub type LogicalTime = u64;

/// Reference to the last transaction that touched an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTransactionId {
    pub lt: LogicalTime,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenTimings {
    pub gen_lt: LogicalTime,
    pub gen_utime: u32,
}

/// Decoded account state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub address: Address,
    /// Full account blob, handed back to the oracle as-is on the next execution.
    #[serde(with = "crate::utils::serde_hex")]
    pub boc: Bytes,
    pub balance: u128,
    pub is_deployed: bool,
    pub code_hash: Option<String>,
    pub last_transaction_id: Option<LastTransactionId>,
    pub gen_timings: GenTimings,
}

impl AccountState {
    /// Whether the account's code hash equals `code_hash`.
    pub fn has_code_hash(&self, code_hash: &str) -> bool {
        self.code_hash.as_deref() == Some(code_hash)
    }
}
