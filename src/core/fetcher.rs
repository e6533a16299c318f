//! Optional lazy account fetcher.
//!
//! When the ledger misses an address, the executor may ask an external fetcher
//! (e.g. a remote node) for the account. Any failure degrades to "account absent"
//! and is logged; it is never surfaced to the caller.

use bytes::Bytes;

use crate::core::account::AccountState;
use crate::core::oracle::{BocKind, OracleAdapter};
use crate::error::{LocalnetError, Result};

/// Reply of an [`AccountFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAccount {
    /// Account blob; `None` when the remote side has no such account.
    pub boc: Option<Bytes>,
    /// Overrides the code hash decoded from the blob.
    pub code_hash: Option<String>,
    pub kind: BocKind,
}

impl FetchedAccount {
    pub fn missing() -> Self {
        Self {
            boc: None,
            code_hash: None,
            kind: BocKind::FullAccount,
        }
    }
}

pub trait AccountFetcher: Send + Sync {
    fn fetch(&self, address: &str) -> anyhow::Result<FetchedAccount>;
}

impl<F> AccountFetcher for F
where
    F: Fn(&str) -> anyhow::Result<FetchedAccount> + Send + Sync,
{
    fn fetch(&self, address: &str) -> anyhow::Result<FetchedAccount> {
        self(address)
    }
}

/// Fetches and decodes `address`. Errors are logged and reported as `None`.
pub fn fetch_account(
    fetcher: &dyn AccountFetcher,
    adapter: &OracleAdapter,
    address: &str,
) -> Option<AccountState> {
    match try_fetch_account(fetcher, adapter, address) {
        Ok(state) => {
            if state.is_some() {
                debug!("Fetched account {} from remote", address);
            }
            state
        }
        Err(e) => {
            warn!("Unable to fetch account {}: {}", address, e);
            None
        }
    }
}

fn try_fetch_account(
    fetcher: &dyn AccountFetcher,
    adapter: &OracleAdapter,
    address: &str,
) -> Result<Option<AccountState>> {
    let fetched = fetcher
        .fetch(address)
        .map_err(|e| LocalnetError::AccountFetch(format!("{:#}", e)))?;
    let Some(boc) = fetched.boc else {
        return Ok(None);
    };

    let mut state = adapter.decode_account(address, &boc, fetched.kind)?;
    if let (Some(state), Some(code_hash)) = (state.as_mut(), fetched.code_hash) {
        state.code_hash = Some(code_hash);
    }
    Ok(state)
}
