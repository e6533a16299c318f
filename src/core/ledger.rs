//! Ledger store: address -> current account state.
//!
//! Backed by an `Arc<HashMap>` with copy-on-write updates, so cloning the ledger for a
//! snapshot is O(1) and the first write afterwards copies the map once.
//!
//! # Invariants
//! - Every address maps to at most one live state.
//! - Enumeration is always sorted by address; `HashMap` order never leaks out.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::account::{AccountState, Address};

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: Arc<HashMap<Address, AccountState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `address`, if any.
    pub fn get(&self, address: &str) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    /// Overwrites the state of `address`.
    pub fn set(&mut self, address: Address, state: AccountState) {
        Arc::make_mut(&mut self.accounts).insert(address, state);
    }

    /// Removes `address` (account destroyed). Returns the previous state.
    pub fn remove(&mut self, address: &str) -> Option<AccountState> {
        if !self.accounts.contains_key(address) {
            return None;
        }
        Arc::make_mut(&mut self.accounts).remove(address)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.accounts.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// All accounts sorted by address.
    pub fn accounts(&self) -> Vec<&AccountState> {
        self.find(|_| true)
    }

    /// Accounts matching `predicate`, sorted by address.
    pub fn find<P>(&self, predicate: P) -> Vec<&AccountState>
    where
        P: Fn(&AccountState) -> bool,
    {
        let mut matched: Vec<(&Address, &AccountState)> = self
            .accounts
            .iter()
            .filter(|(_, state)| predicate(state))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(b.0));
        matched.into_iter().map(|(_, state)| state).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account::GenTimings;
    use bytes::Bytes;

    fn account(address: &str, balance: u128, code_hash: Option<&str>) -> AccountState {
        AccountState {
            address: address.to_string(),
            boc: Bytes::from(address.as_bytes().to_vec()),
            balance,
            is_deployed: code_hash.is_some(),
            code_hash: code_hash.map(str::to_string),
            last_transaction_id: None,
            gen_timings: GenTimings::default(),
        }
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert!(ledger.get("0:01").is_none());
    }

    #[test]
    fn test_set_get_overwrite() {
        let mut ledger = Ledger::new();
        ledger.set("0:01".to_string(), account("0:01", 10, None));
        assert_eq!(ledger.get("0:01").unwrap().balance, 10);

        ledger.set("0:01".to_string(), account("0:01", 25, None));
        assert_eq!(ledger.get("0:01").unwrap().balance, 25);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut ledger = Ledger::new();
        ledger.set("0:01".to_string(), account("0:01", 10, None));
        assert!(ledger.remove("0:01").is_some());
        assert!(!ledger.contains("0:01"));
        assert!(ledger.remove("0:01").is_none());
    }

    #[test]
    fn test_find_sorted_by_address() {
        let mut ledger = Ledger::new();
        ledger.set("0:03".to_string(), account("0:03", 1, Some("aa")));
        ledger.set("0:01".to_string(), account("0:01", 1, Some("aa")));
        ledger.set("0:02".to_string(), account("0:02", 1, Some("bb")));

        let found: Vec<&str> = ledger
            .find(|state| state.has_code_hash("aa"))
            .into_iter()
            .map(|state| state.address.as_str())
            .collect();
        assert_eq!(found, vec!["0:01", "0:03"]);

        let all: Vec<&str> = ledger.accounts().into_iter().map(|s| s.address.as_str()).collect();
        assert_eq!(all, vec!["0:01", "0:02", "0:03"]);
    }

    #[test]
    fn test_clone_copy_on_write() {
        let mut live = Ledger::new();
        live.set("0:01".to_string(), account("0:01", 10, None));
        let copy = live.clone();
        assert!(Arc::ptr_eq(&live.accounts, &copy.accounts));

        live.set("0:01".to_string(), account("0:01", 99, None));
        live.remove("0:01");
        assert!(!Arc::ptr_eq(&live.accounts, &copy.accounts));
        assert_eq!(copy.get("0:01").unwrap().balance, 10);
        assert!(live.get("0:01").is_none());
    }
}
