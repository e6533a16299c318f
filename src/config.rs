//! Engine configuration, loadable from JSON. Binary blobs are hex strings.
//!
//! ```json
//! {
//!   "chain": { "boc": "b5ee9c72...", "global_id": 42 },
//!   "genesis": { "giver_boc": "7b2262..." },
//!   "trace_aborted": true
//! }
//! ```

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::account::Address;
use crate::core::genesis::ZERO_ADDRESS;
use crate::error::{LocalnetError, Result};
use crate::utils::serde_hex;

/// Chain id reported to clients when none is configured.
pub const DEFAULT_GLOBAL_ID: i32 = 42;

/// Faucet address of the local network.
pub const DEFAULT_GIVER_ADDRESS: &str =
    "0:ece57bcc6c530283becbbd8a3b24d3c5987cdddc3c8b7b33be6e4a6312490415";

/// Code hash the zero address reports, so client-side sanity lookups succeed.
pub const DEFAULT_SANITY_CODE_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

fn default_global_id() -> i32 {
    DEFAULT_GLOBAL_ID
}

fn default_giver_address() -> Address {
    DEFAULT_GIVER_ADDRESS.to_string()
}

fn default_sanity_code_hash() -> String {
    DEFAULT_SANITY_CODE_HASH.to_string()
}

fn default_trace_aborted() -> bool {
    true
}

/// Opaque chain configuration handed to the oracle on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(with = "serde_hex", default)]
    pub boc: Bytes,
    #[serde(default = "default_global_id")]
    pub global_id: i32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            boc: Bytes::new(),
            global_id: DEFAULT_GLOBAL_ID,
        }
    }
}

/// Bootstrap accounts. Both the zero address and the giver are decoded from `giver_boc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    #[serde(default = "default_giver_address")]
    pub giver_address: Address,
    #[serde(with = "serde_hex")]
    pub giver_boc: Bytes,
    #[serde(default = "default_sanity_code_hash")]
    pub sanity_code_hash: String,
}

impl GenesisConfig {
    pub fn new(giver_boc: Bytes) -> Self {
        Self {
            giver_address: default_giver_address(),
            giver_boc,
            sanity_code_hash: default_sanity_code_hash(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chain: ChainConfig,
    pub genesis: GenesisConfig,
    /// Re-run aborted transactions with tracing enabled to capture a trace.
    #[serde(default = "default_trace_aborted")]
    pub trace_aborted: bool,
}

impl EngineConfig {
    pub fn new(chain: ChainConfig, genesis: GenesisConfig) -> Self {
        Self {
            chain,
            genesis,
            trace_aborted: true,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LocalnetError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.genesis.giver_boc.is_empty() {
            return Err(LocalnetError::Config("genesis.giver_boc must be non-empty".to_string()));
        }
        if self.genesis.giver_address.is_empty() || self.genesis.giver_address == ZERO_ADDRESS {
            return Err(LocalnetError::Config(
                "genesis.giver_address must be a non-zero address".to_string(),
            ));
        }
        if self.genesis.sanity_code_hash.is_empty() {
            return Err(LocalnetError::Config(
                "genesis.sanity_code_hash must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "genesis": { "giver_boc": "0x7b7d" } }"#).unwrap();
        assert_eq!(config.chain.global_id, DEFAULT_GLOBAL_ID);
        assert!(config.chain.boc.is_empty());
        assert_eq!(config.genesis.giver_address, DEFAULT_GIVER_ADDRESS);
        assert_eq!(&config.genesis.giver_boc[..], b"{}");
        assert_eq!(config.genesis.sanity_code_hash, DEFAULT_SANITY_CODE_HASH);
        assert!(config.trace_aborted);
    }

    #[test]
    fn test_from_json_explicit() {
        let raw = r#"{
            "chain": { "boc": "0102", "global_id": 7 },
            "genesis": { "giver_address": "0:01", "giver_boc": "ff", "sanity_code_hash": "ab" },
            "trace_aborted": false
        }"#;
        let config = EngineConfig::from_json_str(raw).unwrap();
        assert_eq!(&config.chain.boc[..], &[1, 2]);
        assert_eq!(config.chain.global_id, 7);
        assert_eq!(config.genesis.giver_address, "0:01");
        assert!(!config.trace_aborted);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "genesis": { "giver_boc": "zz" } }"#);
        assert!(matches!(result, Err(LocalnetError::Config(_))));
    }

    #[test]
    fn test_empty_giver_rejected() {
        let result = EngineConfig::from_json_str(r#"{ "genesis": { "giver_boc": "" } }"#);
        assert!(matches!(result, Err(LocalnetError::Config(_))));
    }

    #[test]
    fn test_zero_giver_address_rejected() {
        let raw = format!(
            r#"{{ "genesis": {{ "giver_boc": "00", "giver_address": "{}" }} }}"#,
            ZERO_ADDRESS
        );
        assert!(EngineConfig::from_json_str(&raw).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file("/nonexistent/localnet.json");
        assert!(matches!(result, Err(LocalnetError::Config(_))));
    }
}
