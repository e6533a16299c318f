//! Client connector over an [`Executor`].
//!
//! Exposes the request surface a blockchain client library talks to. Blobs are
//! handed out as-is; `send_message` enqueues and drains before returning.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use serde::Serialize;

use crate::core::account::{Address, LogicalTime};
use crate::core::oracle::EMPTY_STATE;
use crate::core::Executor;
use crate::error::{LocalnetError, Result};

/// Upper bound for a single `transactions` request.
pub const MAX_TRANSACTIONS_PER_FETCH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReliableBehavior {
    IntensivePolling,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInfo {
    pub max_transactions_per_fetch: usize,
    pub reliable_behavior: ReliableBehavior,
    pub has_key_blocks: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainConfig {
    pub global_id: i32,
    #[serde(with = "crate::utils::serde_hex")]
    pub boc: Bytes,
}

/// One page of an address listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountsPage {
    pub accounts: Vec<Address>,
    /// Pass back to fetch the next page; `None` once the listing is exhausted.
    pub continuation: Option<Address>,
}

#[derive(Debug)]
pub struct LocalTransport {
    executor: Arc<Executor>,
    capabilities: OnceLock<u64>,
}

impl LocalTransport {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            capabilities: OnceLock::new(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn info(&self) -> TransportInfo {
        TransportInfo {
            max_transactions_per_fetch: MAX_TRANSACTIONS_PER_FETCH,
            reliable_behavior: ReliableBehavior::IntensivePolling,
            has_key_blocks: false,
        }
    }

    pub fn blockchain_config(&self) -> BlockchainConfig {
        let chain = self.executor.chain_config();
        BlockchainConfig {
            global_id: chain.global_id,
            boc: chain.boc.clone(),
        }
    }

    /// Capability bitmask of the chain config. Computed once, then cached.
    pub fn capabilities(&self) -> Result<u64> {
        if let Some(capabilities) = self.capabilities.get() {
            return Ok(*capabilities);
        }
        let computed = self.executor.adapter().capabilities(self.executor.chain_config())?;
        Ok(*self.capabilities.get_or_init(|| computed))
    }

    /// Account blob, or [`EMPTY_STATE`] if the account does not exist.
    pub fn contract_state(&self, address: &str) -> Bytes {
        self.executor
            .get_account(address)
            .map(|state| state.boc)
            .unwrap_or(EMPTY_STATE)
    }

    /// Addresses running code `code_hash`, sorted, at most `limit` per page.
    ///
    /// `continuation` is the last address of the previous page.
    pub fn accounts_by_code_hash(&self, code_hash: &str, limit: usize, continuation: Option<&str>) -> AccountsPage {
        let accounts: Vec<Address> = self
            .executor
            .accounts_by_code_hash(code_hash)
            .into_iter()
            .filter(|address| continuation.map_or(true, |after| address.as_str() > after))
            .take(limit)
            .collect();

        let continuation = if limit > 0 && accounts.len() == limit {
            accounts.last().cloned()
        } else {
            None
        };
        AccountsPage { accounts, continuation }
    }

    /// Transaction blob by transaction hash.
    pub fn transaction(&self, id: &str) -> Option<Bytes> {
        self.executor.get_transaction(id).map(|tx| tx.boc)
    }

    /// Blob of the transaction that consumed message `msg_hash`.
    pub fn dst_transaction(&self, msg_hash: &str) -> Option<Bytes> {
        self.executor.get_dst_transaction(msg_hash).map(|tx| tx.boc)
    }

    /// Transaction blobs on `address` with `lt <= from_lt`, newest first.
    ///
    /// `from_lt` is a decimal string; an empty string means "latest".
    /// `count` is capped at [`MAX_TRANSACTIONS_PER_FETCH`].
    pub fn transactions(&self, address: &str, from_lt: &str, count: usize) -> Result<Vec<Bytes>> {
        let from_lt = parse_lt(from_lt)?;
        let count = count.min(MAX_TRANSACTIONS_PER_FETCH);
        Ok(self
            .executor
            .get_transactions(address, from_lt, count)
            .into_iter()
            .map(|tx| tx.boc)
            .collect())
    }

    /// There are no key blocks on a local network.
    pub fn latest_key_block(&self) -> Option<Bytes> {
        None
    }

    pub fn library_cell(&self, hash: &str) -> Result<Bytes> {
        Err(LocalnetError::Unsupported(format!("library cell {}", hash)))
    }

    /// Decodes, enqueues and drains. Returns the message hash.
    pub fn send_message(&self, boc: &[u8]) -> Result<String> {
        let message = self.executor.adapter().decode_message(boc)?;
        let hash = message.hash.clone();
        self.executor.enqueue_message(message)?;
        self.executor.drain()?;
        Ok(hash)
    }
}

fn parse_lt(raw: &str) -> Result<LogicalTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(LogicalTime::MAX);
    }
    raw.parse::<LogicalTime>()
        .map_err(|e| LocalnetError::Validation(format!("invalid logical time {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{ChainConfig, EngineConfig, DEFAULT_SANITY_CODE_HASH};
    use crate::core::genesis::ZERO_ADDRESS;
    use crate::reference_vm::{ReferenceVm, VmBody, VmMessage, REFERENCE_CAPABILITIES};

    fn transport() -> LocalTransport {
        let config = EngineConfig::new(ChainConfig::default(), ReferenceVm::genesis(10_000).unwrap());
        let executor = Executor::new(config, Arc::new(ReferenceVm::new()))
            .unwrap()
            .with_clock(Arc::new(FixedClock::new(5_000)))
            .unwrap();
        LocalTransport::new(Arc::new(executor))
    }

    #[test]
    fn test_info_and_config() {
        let transport = transport();
        let info = transport.info();
        assert_eq!(info.max_transactions_per_fetch, 255);
        assert_eq!(info.reliable_behavior, ReliableBehavior::IntensivePolling);
        assert!(!info.has_key_blocks);
        assert_eq!(transport.blockchain_config().global_id, 42);
        assert_eq!(transport.capabilities().unwrap(), REFERENCE_CAPABILITIES);
        assert_eq!(transport.capabilities().unwrap(), REFERENCE_CAPABILITIES);
        assert!(transport.latest_key_block().is_none());
        assert!(matches!(transport.library_cell("ab"), Err(LocalnetError::Unsupported(_))));
    }

    #[test]
    fn test_contract_state_sentinel() {
        let transport = transport();
        assert!(transport.contract_state("0:missing").is_empty());
        assert!(!transport.contract_state(ZERO_ADDRESS).is_empty());
    }

    #[test]
    fn test_sanity_code_hash_resolves_zero_address() {
        let page = transport().accounts_by_code_hash(DEFAULT_SANITY_CODE_HASH, 10, None);
        assert_eq!(page.accounts, vec![ZERO_ADDRESS.to_string()]);
        assert!(page.continuation.is_none());
    }

    #[test]
    fn test_accounts_by_code_hash_paging() {
        let transport = transport();
        let giver = transport.executor().config().genesis.giver_address.clone();
        for target in ["0:03", "0:01", "0:02"] {
            let msg = VmMessage::external(
                giver.as_str(),
                VmBody::Forward {
                    to: target.to_string(),
                    value: 1,
                    body: Some(Box::new(VmBody::Deploy { code: "wallet".to_string() })),
                },
            );
            transport.send_message(&msg.encode().unwrap()).unwrap();
        }
        let code_hash = ReferenceVm::code_hash("wallet");

        let first = transport.accounts_by_code_hash(&code_hash, 2, None);
        assert_eq!(first.accounts, vec!["0:01".to_string(), "0:02".to_string()]);
        assert_eq!(first.continuation.as_deref(), Some("0:02"));

        let second = transport.accounts_by_code_hash(&code_hash, 2, first.continuation.as_deref());
        assert_eq!(second.accounts, vec!["0:03".to_string()]);
        assert!(second.continuation.is_none());
    }

    #[test]
    fn test_send_message_drains_queue() {
        let transport = transport();
        let msg = VmMessage::internal("0:aa", "0:bb", 9, VmBody::Transfer);
        let hash = transport.send_message(&msg.encode().unwrap()).unwrap();
        assert_eq!(transport.executor().queue_len(), 0);

        let boc = transport.dst_transaction(&hash).unwrap();
        let tx = transport.executor().get_dst_transaction(&hash).unwrap();
        assert_eq!(boc, tx.boc);
        assert_eq!(transport.transaction(&tx.hash), Some(tx.boc.clone()));
        assert_eq!(transport.transactions("0:bb", "", 10).unwrap(), vec![tx.boc]);
        assert!(transport.transactions("0:bb", "0", 10).unwrap().is_empty());
    }

    #[test]
    fn test_send_message_rejects_garbage() {
        assert!(matches!(transport().send_message(b"nope"), Err(LocalnetError::Oracle(_))));
    }

    #[test]
    fn test_invalid_from_lt() {
        let result = transport().transactions("0:bb", "12x", 1);
        assert!(matches!(result, Err(LocalnetError::Validation(_))));
    }
}
