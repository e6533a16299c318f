//! Bootstrap state: the zero address and the funded giver, both decoded from the
//! single seed account blob in [`GenesisConfig`].

use crate::config::GenesisConfig;
use crate::core::account::AccountState;
use crate::core::oracle::{BocKind, OracleAdapter};
use crate::core::state::SimulationState;
use crate::error::{LocalnetError, Result};

/// Null address. Present only so client-side sanity checks find an account.
pub const ZERO_ADDRESS: &str =
    "0:0000000000000000000000000000000000000000000000000000000000000000";

/// Builds the initial live state.
pub fn bootstrap_state(genesis: &GenesisConfig, adapter: &OracleAdapter) -> Result<SimulationState> {
    let mut zero = decode_seed(genesis, adapter, ZERO_ADDRESS)?;
    zero.code_hash = Some(genesis.sanity_code_hash.clone());
    let giver = decode_seed(genesis, adapter, &genesis.giver_address)?;

    let mut state = SimulationState::new();
    state.ledger.set(ZERO_ADDRESS.to_string(), zero);
    state.ledger.set(genesis.giver_address.clone(), giver);
    Ok(state)
}

fn decode_seed(genesis: &GenesisConfig, adapter: &OracleAdapter, address: &str) -> Result<AccountState> {
    adapter
        .decode_account(address, &genesis.giver_boc, BocKind::AccountStuff)
        .map_err(|e| LocalnetError::Config(format!("invalid genesis.giver_boc: {}", e)))?
        .ok_or_else(|| LocalnetError::Config("genesis.giver_boc decodes to no account".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference_vm::{ReferenceVm, GIVER_CODE};
    use bytes::Bytes;
    use std::sync::Arc;

    fn adapter() -> OracleAdapter {
        OracleAdapter::new(Arc::new(ReferenceVm::new()))
    }

    #[test]
    fn test_bootstrap_seeds_two_accounts() {
        let genesis = ReferenceVm::genesis(1_000).unwrap();
        let state = bootstrap_state(&genesis, &adapter()).unwrap();
        assert_eq!(state.ledger.len(), 2);
        assert!(state.index.is_empty());
        assert!(state.queue.is_empty());

        let giver = state.ledger.get(&genesis.giver_address).unwrap();
        assert_eq!(giver.balance, 1_000);
        assert_eq!(giver.code_hash.as_deref(), Some(ReferenceVm::code_hash(GIVER_CODE).as_str()));

        let zero = state.ledger.get(ZERO_ADDRESS).unwrap();
        assert_eq!(zero.address, ZERO_ADDRESS);
        assert_eq!(zero.code_hash.as_deref(), Some(genesis.sanity_code_hash.as_str()));
    }

    #[test]
    fn test_bootstrap_rejects_bad_seed() {
        let mut genesis = ReferenceVm::genesis(1).unwrap();
        genesis.giver_boc = Bytes::from_static(b"garbage");
        let result = bootstrap_state(&genesis, &adapter());
        assert!(matches!(result, Err(LocalnetError::Config(_))));
    }
}
